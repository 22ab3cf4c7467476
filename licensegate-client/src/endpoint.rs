//! Construction of the confirmation endpoint.
//!
//! The license identifier is percent-encoded as one opaque path segment and
//! appended to the base URL's path, so `LI/../LI` never walks up the server's
//! path hierarchy.

use crate::error::{LicenseError, LicenseResult};
use reqwest::Url;

/// Escapes a license identifier for use as a single URL path segment.
///
/// `.` and `..` are rejected: URL parsers resolve them as dot segments even
/// when they are the whole segment.
pub fn escape_license(license: &str) -> LicenseResult<String> {
    if license == "." || license == ".." {
        return Err(LicenseError::InvalidLicense(format!(
            "{license:?} is a relative path segment"
        )));
    }
    Ok(urlencoding::encode(license).into_owned())
}

/// Joins the base server URL and the escaped license identifier.
pub fn build_endpoint(server_url: &str, license: &str) -> LicenseResult<Url> {
    let mut url = Url::parse(server_url.trim())
        .map_err(|e| LicenseError::InvalidServerUrl(format!("{server_url:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(LicenseError::InvalidServerUrl(format!(
            "unsupported scheme {:?}",
            url.scheme()
        )));
    }

    let segment = escape_license(license)?;
    let path = format!("{}/{}", url.path().trim_end_matches('/'), segment);
    url.set_path(&path);
    Ok(url)
}
