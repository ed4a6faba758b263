use assert_matches::assert_matches;

use gpml_convert::domain::{ConversionPath, OutputFormat, PathwayTarget};
use gpml_convert::error::ConvertError;

#[test]
fn resolves_id_and_version_from_file_name() {
    let target = PathwayTarget::resolve(None, "./WP4542_103412.gpml", None).unwrap();
    assert_eq!(target.id.as_str(), "WP4542");
    assert_eq!(target.version.as_deref(), Some("103412"));
    assert_eq!(target.iri, "http://identifiers.org/wikipathways/WP4542");
}

#[test]
fn accepts_revision_prefix() {
    let target = PathwayTarget::resolve(None, "WP554_r94286.gpml", None).unwrap();
    assert_eq!(target.id.as_str(), "WP554");
    assert_eq!(target.version.as_deref(), Some("94286"));
}

#[test]
fn explicit_version_wins() {
    let target = PathwayTarget::resolve(Some("WP4542"), "WP4542_103412.gpml", Some("69897")).unwrap();
    assert_eq!(target.version.as_deref(), Some("69897"));
}

#[test]
fn id_without_version() {
    let target = PathwayTarget::resolve(Some("WP1243"), "pathway.gpml", None).unwrap();
    assert_eq!(target.id.as_str(), "WP1243");
    assert!(target.version.is_none());
}

#[test]
fn iri_argument_is_kept() {
    let iri = "http://identifiers.org/wikipathways/WP4542";
    let target = PathwayTarget::resolve(Some(iri), "input.gpml", None).unwrap();
    assert_eq!(target.id.as_str(), "WP4542");
    assert_eq!(target.iri, iri);
}

#[test]
fn missing_id_is_rejected() {
    let err = PathwayTarget::resolve(None, "pathway.gpml", None).unwrap_err();
    assert_matches!(err, ConvertError::InvalidPathwayId(_));
}

#[test]
fn output_extensions_route_to_conversions() {
    let cases = [
        ("gpml", ConversionPath::Exporter),
        ("owl", ConversionPath::Exporter),
        ("pdf", ConversionPath::Exporter),
        ("pwf", ConversionPath::Exporter),
        ("txt", ConversionPath::Exporter),
        ("png", ConversionPath::Raster),
        ("json", ConversionPath::Json),
        ("jsonld", ConversionPath::Json),
        ("svg", ConversionPath::Svg),
        ("pvjssvg", ConversionPath::Svg),
    ];
    for (extension, expected) in cases {
        let format: OutputFormat = extension.parse().unwrap();
        assert_eq!(format.path, expected, "{extension}");
    }
}
