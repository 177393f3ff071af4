// SPDX-License-Identifier: Apache-2.0

//! USB CDC console.
//!
//! The device is polled from `USBCTRL_IRQ` through [`poll`]; [`UsbConsole`] writes from the tick
//! handler. Both reach the port through [`USB`].

use core::cell::RefCell;

use critical_section::Mutex;
use rp2040_hal::usb::UsbBus;
use usb_device::{class_prelude::UsbBusAllocator, device::BuilderError, prelude::*};
use usbd_serial::SerialPort;

use crate::components::{Console, Transport};

/// Room for a full tick of console lines between two USB polls
const WRITE_STORE: usize = 1024;

/// USB CDC serial port with a large write buffer
type Serial = SerialPort<'static, UsbBus, [u8; 64], [u8; WRITE_STORE]>;

/// Device and serial class
pub struct UsbLink {
    /// USB device state machine
    device: UsbDevice<'static, UsbBus>,
    /// CDC-ACM class
    serial: Serial,
}

/// USB link for access in interrupts
pub static USB: Mutex<RefCell<Option<UsbLink>>> = Mutex::new(RefCell::new(None));

/// Build the CDC device on `bus` and store it in [`USB`]
pub fn install(bus: &'static UsbBusAllocator<UsbBus>) -> Result<(), BuilderError> {
    let serial = SerialPort::new_with_store(bus, [0u8; 64], [0u8; WRITE_STORE]);
    let device = UsbDeviceBuilder::new(bus, UsbVidPid(0x16c0, 0x27dd))
        .strings(&[StringDescriptors::default()
            .manufacturer("TempCycleDMA")
            .product("RP2040 temperature monitor")
            .serial_number("TEMPCYCLE")])?
        .device_class(usbd_serial::USB_CLASS_CDC)
        .build();

    debug!("critical_section: install USB link");
    critical_section::with(|cs| USB.replace(cs, Some(UsbLink { device, serial })));
    Ok(())
}

/// Service the USB device. Called from `USBCTRL_IRQ`.
pub fn poll() {
    critical_section::with(|cs| {
        if let Some(link) = USB.borrow_ref_mut(cs).as_mut() {
            if link.device.poll(&mut [&mut link.serial]) {
                // Input is not used; drain it so the host never stalls
                let mut discard = [0u8; 64];
                link.serial.read(&mut discard).ok();
            }
        }
    });
}

/// Console and transport over the shared USB link
pub struct UsbConsole;

impl Console for UsbConsole {
    fn write_line(&mut self, line: &str) {
        critical_section::with(|cs| {
            if let Some(link) = USB.borrow_ref_mut(cs).as_mut() {
                let written =
                    write_all(&mut link.serial, line.as_bytes()) && write_all(&mut link.serial, b"\r\n");
                if !written {
                    warn!("USB write buffer full, console line dropped");
                }
            }
        });
    }
}

impl Transport for UsbConsole {
    fn is_connected(&mut self) -> bool {
        critical_section::with(|cs| {
            USB.borrow_ref_mut(cs).as_mut().is_some_and(|link| {
                link.device.state() == UsbDeviceState::Configured && link.serial.dtr()
            })
        })
    }
}

/// Queue all of `bytes`. Returns `false` if the write buffer filled up first.
fn write_all(serial: &mut Serial, mut bytes: &[u8]) -> bool {
    while !bytes.is_empty() {
        match serial.write(bytes) {
            Ok(count) => bytes = &bytes[count..],
            Err(_) => return false,
        }
    }
    true
}
