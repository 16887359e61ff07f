use crate::model::AdcApp;

use super::options::BuildOptions;

/// Upper bound on a sanitized name.
pub const MAX_NAME_LEN: usize = 48;

const DIGIT_PREFIX: &str = "app_";
const EMPTY_NAME: &str = "app";

/// Reduce a dialect name to `[A-Za-z0-9_]`, case preserved.
pub fn sanitize(name: &str) -> String {
    let unquoted = name.trim().trim_matches(|c| c == '"' || c == '\'');

    let mut out = String::with_capacity(unquoted.len());
    for c in unquoted.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    if out.is_empty() {
        return EMPTY_NAME.to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, DIGIT_PREFIX);
    }
    // ASCII only by now, so any byte index is a char boundary.
    out.truncate(MAX_NAME_LEN);
    out
}

/// Generated names for one application's declaration objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppNames {
    pub tenant: String,
    pub application: String,
    pub service: String,
    pub pool: String,
    pub tls: String,
}

impl AppNames {
    pub fn for_app(app: &AdcApp, opts: &BuildOptions) -> Self {
        let base = sanitize(&app.name);
        let application = if opts.include_protocol_port {
            let port = if app.is_wildcard_port() {
                ""
            } else {
                app.port.as_deref().map(str::trim).unwrap_or_default()
            };
            format!("{base}_{}{port}", app.protocol.to_ascii_lowercase())
        } else {
            base.clone()
        };

        Self {
            tenant: format!("{}_{base}", opts.tenant_prefix),
            service: format!("{application}_vs"),
            pool: format!("{application}_pool"),
            tls: format!("{application}_tls"),
            application,
        }
    }

    /// `_mon`, `_mon_2`, `_mon_3`, ... by zero-based position.
    pub fn monitor(&self, idx: usize) -> String {
        numbered(&self.application, "mon", idx)
    }

    /// `_cert`, `_cert_2`, ... by zero-based position.
    pub fn certificate(&self, idx: usize) -> String {
        numbered(&self.application, "cert", idx)
    }
}

fn numbered(base: &str, suffix: &str, idx: usize) -> String {
    if idx == 0 {
        format!("{base}_{suffix}")
    } else {
        format!("{base}_{suffix}_{}", idx + 1)
    }
}
