mod device_set;

pub(crate) use device_set::DeviceSet;
pub use device_set::DeviceSnapshot;
