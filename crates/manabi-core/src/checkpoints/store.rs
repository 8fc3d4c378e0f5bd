use std::collections::HashSet;
use std::path::PathBuf;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::AssetFetcher;
use crate::models::{Checkpoint, LatLng, DEFAULT_RADIUS_M};

use super::LoadError;

/// Where the checkpoint resource comes from.
#[derive(Debug, Clone)]
pub enum CheckpointSource {
    /// A GeoJSON file on disk.
    File(PathBuf),
    /// A URL, fetched through an `AssetFetcher` (normally the offline cache).
    Url(Url),
    /// GeoJSON text already in memory.
    Inline(String),
}

// ============================================================================
// GeoJSON wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Option<Vec<Feature>>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

#[derive(Debug, Deserialize)]
struct Properties {
    name: Option<String>,
    radius: Option<f64>,
    quiz: Option<String>,
    answer: Option<String>,
}

// ============================================================================
// Loading
// ============================================================================

/// Load checkpoints from `source`.
///
/// `fetcher` is only consulted for `CheckpointSource::Url`.
pub async fn load(
    source: &CheckpointSource,
    fetcher: &dyn AssetFetcher,
) -> Result<Vec<Checkpoint>, LoadError> {
    let checkpoints = match source {
        CheckpointSource::File(path) => {
            debug!(?path, "Reading checkpoint file");
            let bytes = tokio::fs::read(path).await.map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            })?;
            parse(&bytes)?
        }
        CheckpointSource::Url(url) => {
            debug!(%url, "Fetching checkpoint data");
            let asset = fetcher.fetch(url).await?;
            parse(&asset.body)?
        }
        CheckpointSource::Inline(text) => parse(text.as_bytes())?,
    };

    info!(count = checkpoints.len(), "Checkpoints loaded");
    Ok(checkpoints)
}

/// Parse a GeoJSON FeatureCollection into checkpoints, keeping feature order.
pub fn parse(bytes: &[u8]) -> Result<Vec<Checkpoint>, LoadError> {
    let collection: FeatureCollection = serde_json::from_slice(bytes)?;
    if collection.kind != "FeatureCollection" {
        return Err(LoadError::NotAFeatureCollection(collection.kind));
    }

    let features = collection
        .features
        .ok_or_else(|| LoadError::NotAFeatureCollection("missing features".to_string()))?;

    let checkpoints = features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| to_checkpoint(index, feature))
        .collect::<Result<Vec<_>, _>>()?;

    // Unique names are advisory only
    let mut seen = HashSet::new();
    for cp in &checkpoints {
        if !seen.insert(cp.name.as_str()) {
            warn!(name = %cp.name, "Duplicate checkpoint name");
        }
    }

    Ok(checkpoints)
}

fn to_checkpoint(index: usize, feature: Feature) -> Result<Checkpoint, LoadError> {
    let geometry = feature
        .geometry
        .ok_or_else(|| LoadError::malformed(index, "missing geometry"))?;
    if geometry.kind != "Point" {
        return Err(LoadError::malformed(
            index,
            format!("geometry type {:?} is not Point", geometry.kind),
        ));
    }
    let location = point_coordinates(&geometry.coordinates)
        .ok_or_else(|| LoadError::malformed(index, "coordinates must be [lng, lat]"))?;
    if !location.is_valid() {
        return Err(LoadError::malformed(
            index,
            format!("coordinates out of range: {}", location),
        ));
    }

    let props = feature
        .properties
        .ok_or_else(|| LoadError::malformed(index, "missing properties"))?;

    let name = props
        .name
        .ok_or_else(|| LoadError::malformed(index, "missing name"))?;
    let quiz = props
        .quiz
        .ok_or_else(|| LoadError::malformed(index, format!("{}: missing quiz", name)))?;
    let answer = props
        .answer
        .ok_or_else(|| LoadError::malformed(index, format!("{}: missing answer", name)))?;

    let radius_m = props.radius.unwrap_or(DEFAULT_RADIUS_M);
    if !radius_m.is_finite() || radius_m < 0.0 {
        return Err(LoadError::malformed(
            index,
            format!("{}: radius {} is not a non-negative distance", name, radius_m),
        ));
    }

    Ok(Checkpoint {
        name,
        location,
        radius_m,
        quiz,
        answer,
    })
}

/// GeoJSON positions are `[lng, lat]`, optionally followed by altitude.
fn point_coordinates(value: &Value) -> Option<LatLng> {
    let coords = value.as_array()?;
    if coords.len() < 2 {
        return None;
    }
    let lng = coords[0].as_f64()?;
    let lat = coords[1].as_f64()?;
    Some(LatLng::new(lat, lng))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Asset, FetchError};
    use async_trait::async_trait;

    const PLACES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [139.4500, 36.3400]},
                "properties": {"name": "Station square", "radius": 80, "quiz": "What color is the clock?", "answer": "Green"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [139.4531, 36.3422, 41.0]},
                "properties": {"name": "Old bridge", "quiz": "When was it built?", "answer": "1921"}
            }
        ]
    }"#;

    struct Unreachable;

    #[async_trait]
    impl AssetFetcher for Unreachable {
        async fn fetch(&self, url: &Url) -> Result<Asset, FetchError> {
            Err(FetchError::NotFound(url.to_string()))
        }
    }

    #[test]
    fn test_parse_places() {
        let checkpoints = parse(PLACES.as_bytes()).unwrap();
        assert_eq!(checkpoints.len(), 2);

        let first = &checkpoints[0];
        assert_eq!(first.name, "Station square");
        assert_eq!(first.location, LatLng::new(36.34, 139.45)); // [lng, lat] swapped
        assert_eq!(first.radius_m, 80.0);
        assert_eq!(first.answer, "Green");

        // No radius property falls back to the default
        assert_eq!(checkpoints[1].radius_m, DEFAULT_RADIUS_M);
    }

    #[test]
    fn test_parse_empty_collection() {
        let checkpoints = parse(br#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(checkpoints.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_collection() {
        let err = parse(br#"{"type":"Feature","features":[]}"#).unwrap_err();
        assert!(matches!(err, LoadError::NotAFeatureCollection(_)));

        let err = parse(br#"{"type":"FeatureCollection"}"#).unwrap_err();
        assert!(matches!(err, LoadError::NotAFeatureCollection(_)));

        let err = parse(b"not json").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let missing_quiz = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[139.45,36.34]},
             "properties":{"name":"Gate","answer":"Red"}}]}"#;
        let err = parse(missing_quiz.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { index: 0, .. }));

        let bad_coords = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[139.45]},
             "properties":{"name":"Gate","quiz":"?","answer":"Red"}}]}"#;
        assert!(parse(bad_coords.as_bytes()).is_err());

        let line = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[[139.45,36.34],[139.46,36.35]]},
             "properties":{"name":"Path","quiz":"?","answer":"!"}}]}"#;
        assert!(parse(line.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_rejects_negative_radius() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[139.45,36.34]},
             "properties":{"name":"Gate","radius":-5,"quiz":"?","answer":"!"}}]}"#;
        let err = parse(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("radius"));
    }

    #[tokio::test]
    async fn test_load_inline_and_missing_file() {
        let inline = CheckpointSource::Inline(PLACES.to_string());
        assert_eq!(load(&inline, &Unreachable).await.unwrap().len(), 2);

        let missing = CheckpointSource::File(PathBuf::from("/nonexistent/places.geojson"));
        let err = load(&missing, &Unreachable).await.unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[tokio::test]
    async fn test_load_url_fetch_failure() {
        let url = Url::parse("https://example.org/data/places.geojson").unwrap();
        let err = load(&CheckpointSource::Url(url), &Unreachable).await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch(_)));
        assert!(err.user_message().starts_with("Quiz unavailable"));
    }
}
