//! Asset field validation, tag normalization, and popularity scoring.
//!
//! Catalog entries can be created from a manual upload or derived from a
//! completed generation task; both paths run through the same validation
//! before anything touches the database.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Field bounds
// ---------------------------------------------------------------------------

/// Maximum length of an asset name.
pub const MAX_NAME_LEN: usize = 100;
/// Maximum length of a breed name.
pub const MAX_BREED_LEN: usize = 50;
/// Maximum length of an asset description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Lowest acceptable polygon count for a stored model.
pub const MIN_POLYGONS: i32 = 100;
/// Highest acceptable polygon count for a stored model.
pub const MAX_POLYGONS: i32 = 1_000_000;

// ---------------------------------------------------------------------------
// Popularity
// ---------------------------------------------------------------------------

/// Weight of a single download in the popularity score.
pub const DOWNLOAD_WEIGHT: i32 = 10;
/// Weight of a single view in the popularity score.
pub const VIEW_WEIGHT: i32 = 1;
/// Popularity ceiling.
pub const MAX_POPULARITY: i32 = 100;

/// Compute the derived popularity score from the two counters.
///
/// `min(100, (downloads * 10 + views) / 10)`, floored integer division.
/// Popularity is never stored independently of the counters; the
/// repository recomputes it in the same statement as any counter bump.
pub fn compute_popularity(downloads: i32, views: i32) -> i32 {
    let score = downloads * DOWNLOAD_WEIGHT + views * VIEW_WEIGHT;
    (score / 10).min(MAX_POPULARITY)
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validated textual fields of an asset, trimmed and length-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFields {
    pub name: String,
    pub breed: String,
    pub description: String,
}

/// Validate the three required text fields of an asset.
///
/// Each field must be non-empty after trimming and within its length bound.
pub fn validate_asset_fields(
    name: &str,
    breed: &str,
    description: &str,
) -> Result<AssetFields, CoreError> {
    let name = validate_field(name, "name", MAX_NAME_LEN)?;
    let breed = validate_field(breed, "breed", MAX_BREED_LEN)?;
    let description = validate_field(description, "description", MAX_DESCRIPTION_LEN)?;
    Ok(AssetFields {
        name,
        breed,
        description,
    })
}

/// Validate that a polygon count is within the storable range.
///
/// Unlike the generator's target polycount (which is clamped on submission),
/// an out-of-range value on a catalog entry is a caller error.
pub fn validate_polygons(polygons: i32) -> Result<(), CoreError> {
    if (MIN_POLYGONS..=MAX_POLYGONS).contains(&polygons) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "polygons must be between {MIN_POLYGONS} and {MAX_POLYGONS}, got {polygons}"
        )))
    }
}

/// Normalize a tag list: trim, lowercase, drop empties, dedupe.
///
/// Insertion order is preserved for display; querying treats the set as
/// order-irrelevant.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let t = tag.as_ref().trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/// Trim a text field, require it non-empty, enforce a length bound.
pub fn validate_field(value: &str, field: &str, max_len: usize) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(CoreError::Validation(format!(
            "{field} cannot exceed {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
