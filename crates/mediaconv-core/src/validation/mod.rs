//! Validation modules

pub mod conversion;

pub use conversion::{
    compute_new_mime_type, compute_new_save_path, compute_new_url, is_allowed_source,
    resolve_target_format, resolve_target_format_value, validate_new_save_path,
    validate_new_url, ConversionRejection, ConversionValidator,
};
