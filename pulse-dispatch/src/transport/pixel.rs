//! Pixel request encoding: the batch rides in the query string of a GET.
//!
//! `{endpoint}?project_id={id}&data={base64url(json array)}`. Batches whose
//! URL would exceed the ceiling are split by halving until every request
//! fits; a single element that still does not fit cannot be sent.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Query parameter carrying the encoded batch.
pub const DATA_PARAM: &str = "data";

/// One pixel GET and the batch positions it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRequest {
    pub url: String,
    pub indices: Vec<usize>,
}

/// Requests covering a batch, plus positions too large to ever fit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelPlan {
    pub requests: Vec<PixelRequest>,
    pub oversized: Vec<usize>,
}

/// Build the URL for one group of serialized wire elements.
pub fn pixel_url(endpoint: &str, project_id: u64, elements: &[&str]) -> String {
    let json = format!("[{}]", elements.join(","));
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{endpoint}{sep}project_id={project_id}&{DATA_PARAM}={}",
        URL_SAFE_NO_PAD.encode(json)
    )
}

/// Split `elements` (batch position, serialized wire element) into requests
/// whose URLs fit within `max_url_length`.
pub fn plan(
    endpoint: &str,
    project_id: u64,
    elements: &[(usize, String)],
    max_url_length: usize,
) -> PixelPlan {
    let mut plan = PixelPlan::default();
    split_into(endpoint, project_id, elements, max_url_length, &mut plan);
    plan
}

fn split_into(
    endpoint: &str,
    project_id: u64,
    elements: &[(usize, String)],
    max_url_length: usize,
    plan: &mut PixelPlan,
) {
    if elements.is_empty() {
        return;
    }
    let raw: Vec<&str> = elements.iter().map(|(_, v)| v.as_str()).collect();
    let url = pixel_url(endpoint, project_id, &raw);
    if url.len() <= max_url_length {
        plan.requests.push(PixelRequest {
            url,
            indices: elements.iter().map(|(i, _)| *i).collect(),
        });
        return;
    }
    if elements.len() == 1 {
        plan.oversized.push(elements[0].0);
        return;
    }
    let (left, right) = elements.split_at(elements.len() / 2);
    split_into(endpoint, project_id, left, max_url_length, plan);
    split_into(endpoint, project_id, right, max_url_length, plan);
}

/// Decode the data parameter of a pixel URL back into its JSON array.
pub fn decode_data(url: &str) -> Option<serde_json::Value> {
    let query = url.split_once('?')?.1;
    let encoded = query
        .split('&')
        .find_map(|pair| pair.strip_prefix(DATA_PARAM)?.strip_prefix('='))?;
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    serde_json::from_slice(&bytes).ok()
}
