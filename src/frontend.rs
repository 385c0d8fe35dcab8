//! Lowering of WGSL source to SPIR-V, so every module goes through the same validation and
//! reflection.

use crate::ShaderError;

#[cfg(feature = "wgsl")]
pub(crate) fn wgsl_to_spirv(source: &str) -> Result<Vec<u32>, ShaderError> {
    use naga::back::spv;
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| ShaderError::Frontend(err.emit_to_string(source)))?;

    if module.entry_points.len() != 1 {
        return Err(ShaderError::Frontend(format!(
            "expected exactly one entry point, found {}",
            module.entry_points.len()
        )));
    }

    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| ShaderError::Frontend(err.emit_to_string(source)))?;

    let options = spv::Options {
        lang_version: (1, 0),
        flags: spv::WriterFlags::empty(),
        ..Default::default()
    };
    let words = spv::write_vec(&module, &info, &options, None)
        .map_err(|err| ShaderError::Frontend(err.to_string()))?;

    log::trace!("lowered WGSL to {} SPIR-V words", words.len());
    Ok(words)
}

#[cfg(not(feature = "wgsl"))]
pub(crate) fn wgsl_to_spirv(_source: &str) -> Result<Vec<u32>, ShaderError> {
    Err(ShaderError::UnsupportedPath("WGSL"))
}

#[cfg(all(test, feature = "wgsl"))]
mod tests {
    use super::*;

    #[test]
    fn lowers_compute_shader() {
        let words = wgsl_to_spirv("@compute @workgroup_size(1) fn main() {}").unwrap();
        assert_eq!(words[0], 0x0723_0203);
    }

    #[test]
    fn parse_errors() {
        let err = wgsl_to_spirv("fn main( {").unwrap_err();
        assert!(matches!(err, ShaderError::Frontend(_)));
    }

    #[test]
    fn needs_one_entry_point() {
        let err = wgsl_to_spirv("fn helper() {}").unwrap_err();
        assert!(matches!(err, ShaderError::Frontend(message) if message.contains("found 0")));
    }

    #[test]
    fn validation_errors_quote_the_source() {
        let source = "fn helper() -> i32 {}\n@compute @workgroup_size(1) fn main() {}";
        let err = wgsl_to_spirv(source).unwrap_err();
        assert!(matches!(err, ShaderError::Frontend(message) if message.starts_with("error:")));
    }
}
