use std::fmt::Debug;

use wgpu::{Features, TextureFormat, TextureFormatFeatures, TextureUsages};

/// The device's knowledge of what each texture format can be used for.
pub trait FormatTable: Debug + Send + Sync {
    /// The capabilities of `format` on this device.
    fn format_features(&self, format: TextureFormat) -> TextureFormatFeatures;

    /// Whether `format` can back a storage texture binding.
    fn supports_storage_usage(&self, format: TextureFormat) -> bool {
        self.format_features(format)
            .allowed_usages
            .contains(TextureUsages::STORAGE_BINDING)
    }
}

/// The format capabilities every adapter guarantees for a set of enabled features.
#[derive(Clone, Copy, Debug, Default)]
pub struct GuaranteedFormats {
    features: Features,
}

impl GuaranteedFormats {
    pub fn new(features: Features) -> Self {
        Self { features }
    }
}

impl FormatTable for GuaranteedFormats {
    fn format_features(&self, format: TextureFormat) -> TextureFormatFeatures {
        format.guaranteed_format_features(self.features)
    }
}
