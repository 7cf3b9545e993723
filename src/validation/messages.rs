//! Parameterized catalog of validation error messages.
//!
//! Kept apart from the rule engine so the text can be localized on its
//! own. Everything user-facing is in Portuguese, matching the product.

pub fn required(field: &str) -> String {
    format!("{} é obrigatório", field)
}

pub fn min_length(field: &str, min: usize) -> String {
    format!("{} deve ter pelo menos {} caracteres", field, min)
}

pub fn max_length(field: &str, max: usize) -> String {
    format!("{} não pode exceder {} caracteres", field, max)
}

pub fn invalid_format(field: &str) -> String {
    format!("{} inválido", field)
}

pub const INVALID_EMAIL: &str = "Email inválido";

pub const INVALID_USERNAME: &str = "Username só pode conter letras, números e underscore";

pub const IMAGE_REQUIRED: &str = "É necessário adicionar uma imagem";

pub fn file_too_large(max_bytes: u64) -> String {
    format!("Arquivo muito grande. Máximo: {}", format_bytes(max_bytes))
}

pub fn file_too_small(min_bytes: u64) -> String {
    format!("Arquivo muito pequeno. Mínimo: {}", format_bytes(min_bytes))
}

pub fn invalid_file_type(allowed_extensions: &[String]) -> String {
    format!(
        "Apenas arquivos {} são permitidos",
        allowed_extensions.join(", ")
    )
}

/// Human-readable byte count, base 1024, trailing zeros trimmed.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exp = (((bytes as f64).ln() / 1024_f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exp as i32);

    let mut formatted = format!("{:.2}", value);
    if formatted.contains('.') {
        while formatted.ends_with('0') {
            formatted.pop();
        }
        if formatted.ends_with('.') {
            formatted.pop();
        }
    }

    format!("{} {}", formatted, UNITS[exp])
}
