//! Extraction of subset query parameters.
//!
//! The `subset` parameter repeats, one clause per axis, and clause order matters for
//! error reporting, so the standard query extractor (which collapses repeated keys)
//! cannot be used. This extractor walks the raw query string instead.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::GeosliceError;

/// The subset parameters of one coverage request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubsetParams {
    /// Raw `subset` clauses, in request order
    pub subsets: Vec<String>,
    /// Attribute names from `rangesubset`, in request order
    pub range_subset: Option<Vec<String>>,
}

#[async_trait]
impl<S> FromRequestParts<S> for SubsetParams
where
    S: Send + Sync,
{
    type Rejection = GeosliceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or("");
        let mut params = SubsetParams::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "subset" => params.subsets.push(value.into_owned()),
                "rangesubset" => {
                    let names = params.range_subset.get_or_insert_with(Vec::new);
                    names.extend(value.split(',').map(|name| name.trim().to_string()));
                }
                _ => {}
            }
        }
        Ok(params)
    }
}
