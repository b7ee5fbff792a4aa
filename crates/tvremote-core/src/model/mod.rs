// ── Domain model ──
//
// Value types describing a discovered TV. Everything here is immutable
// after construction and safe to share behind `Arc`.

pub mod device;
pub mod device_id;
pub mod features;
pub mod html;

pub use device::{Device, VendorInfo};
pub use device_id::{DeviceId, MacAddress};
pub use features::DeviceFeatures;
pub use html::decode_entities;
