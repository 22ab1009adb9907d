//! Media storage adapters

mod usb;

pub use usb::{default_media_dir, UsbMediaStorage, MEDIA_DIR_ENV, USB_MEDIA_SUBDIR};
