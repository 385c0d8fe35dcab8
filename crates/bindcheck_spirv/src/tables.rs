//! Fixed mappings from SPIR-V declarations to the API's texture vocabulary.

use spirv::{Dim, ImageFormat};
use wgpu::{TextureFormat, TextureViewDimension};

use crate::module::ScalarKind;

/// The numeric class of a texture's components or of a render target, as seen by pipelines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FormatType {
    /// Floating point or normalized.
    Float,
    /// Signed integer.
    Sint,
    /// Unsigned integer.
    Uint,
    /// Anything else. Fragment outputs nobody writes stay `Other`.
    #[default]
    Other,
}

/// Map a scalar kind to the format type a texture or attachment must have to match it.
pub fn format_type(kind: ScalarKind) -> FormatType {
    match kind {
        ScalarKind::Float => FormatType::Float,
        ScalarKind::Sint => FormatType::Sint,
        ScalarKind::Uint => FormatType::Uint,
        ScalarKind::Bool => FormatType::Other,
    }
}

/// Map an image's dimensionality and arrayness to a texture view dimension.
///
/// # Panics
///
/// On dimensions other than 1D, 2D, 3D and Cube, which validation rejects.
pub fn view_dimension(dim: Dim, arrayed: bool) -> TextureViewDimension {
    match (dim, arrayed) {
        (Dim::Dim1D, _) => TextureViewDimension::D1,
        (Dim::Dim2D, false) => TextureViewDimension::D2,
        (Dim::Dim2D, true) => TextureViewDimension::D2Array,
        (Dim::Dim3D, _) => TextureViewDimension::D3,
        (Dim::DimCube, false) => TextureViewDimension::Cube,
        (Dim::DimCube, true) => TextureViewDimension::CubeArray,
        (dim, _) => unreachable!("image dimension {dim:?} is rejected by validation"),
    }
}

/// Map a storage image's declared format to the texture format it binds. `None` for formats
/// with no texture format counterpart, including `Unknown`.
pub fn storage_texture_format(format: ImageFormat) -> Option<TextureFormat> {
    use ImageFormat as I;
    use TextureFormat as T;

    Some(match format {
        I::R8 => T::R8Unorm,
        I::R8Snorm => T::R8Snorm,
        I::R8ui => T::R8Uint,
        I::R8i => T::R8Sint,

        I::R16ui => T::R16Uint,
        I::R16i => T::R16Sint,
        I::R16f => T::R16Float,
        I::R16 => T::R16Unorm,
        I::R16Snorm => T::R16Snorm,
        I::Rg8 => T::Rg8Unorm,
        I::Rg8Snorm => T::Rg8Snorm,
        I::Rg8ui => T::Rg8Uint,
        I::Rg8i => T::Rg8Sint,

        I::R32f => T::R32Float,
        I::R32ui => T::R32Uint,
        I::R32i => T::R32Sint,
        I::Rg16ui => T::Rg16Uint,
        I::Rg16i => T::Rg16Sint,
        I::Rg16f => T::Rg16Float,
        I::Rg16 => T::Rg16Unorm,
        I::Rg16Snorm => T::Rg16Snorm,
        I::Rgba8 => T::Rgba8Unorm,
        I::Rgba8Snorm => T::Rgba8Snorm,
        I::Rgba8ui => T::Rgba8Uint,
        I::Rgba8i => T::Rgba8Sint,
        I::Rgb10A2 => T::Rgb10a2Unorm,
        I::R11fG11fB10f => T::Rg11b10Float,

        I::Rg32f => T::Rg32Float,
        I::Rg32ui => T::Rg32Uint,
        I::Rg32i => T::Rg32Sint,
        I::Rgba16ui => T::Rgba16Uint,
        I::Rgba16i => T::Rgba16Sint,
        I::Rgba16f => T::Rgba16Float,
        I::Rgba16 => T::Rgba16Unorm,
        I::Rgba16Snorm => T::Rgba16Snorm,

        I::Rgba32f => T::Rgba32Float,
        I::Rgba32ui => T::Rgba32Uint,
        I::Rgba32i => T::Rgba32Sint,

        _ => return None,
    })
}
