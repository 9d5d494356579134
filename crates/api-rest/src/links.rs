//! `next`/`previous` links for paginated responses.

use consult_core::{Page, PatientId};

/// Query parameters carried from the request into every page link.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkParams {
    /// Only set when the client supplied `page_size`.
    pub page_size: Option<u32>,
    pub patient: Option<PatientId>,
}

/// Request-relative link to `page`. Page 1 omits the `page` parameter.
pub fn page_link(path: &str, page: u32, params: LinkParams) -> String {
    let mut query = Vec::new();
    if page > 1 {
        query.push(format!("page={page}"));
    }
    if let Some(size) = params.page_size {
        query.push(format!("page_size={size}"));
    }
    if let Some(patient) = params.patient {
        query.push(format!("patient={patient}"));
    }

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", query.join("&"))
    }
}

/// The `(next, previous)` links of `page`.
pub fn page_links<T>(path: &str, page: &Page<T>, params: LinkParams) -> (Option<String>, Option<String>) {
    let current = page.request.page;
    let next = page
        .has_next()
        .then(|| page_link(path, current + 1, params));
    let previous = page
        .has_previous()
        .then(|| page_link(path, current - 1, params));
    (next, previous)
}
