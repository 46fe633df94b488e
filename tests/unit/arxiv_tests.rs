/*!
 * Tests for arXiv identifier parsing and the metadata feed
 */

use papertrans::arxiv::{ArxivClient, extract_arxiv_id, parse_atom_feed};
use papertrans::app_config::ArxivConfig;
use papertrans::errors::FetchError;
use crate::common;

#[test]
fn test_extract_arxiv_id_withBareIdentifiers_shouldAccept() {
    assert_eq!(extract_arxiv_id("2401.01234").unwrap().as_str(), "2401.01234");
    assert_eq!(extract_arxiv_id(" 2401.01234v3 ").unwrap().as_str(), "2401.01234v3");
    assert_eq!(extract_arxiv_id("arXiv:1706.03762").unwrap().as_str(), "1706.03762");
    assert_eq!(extract_arxiv_id("hep-th/9901001").unwrap().as_str(), "hep-th/9901001");
    assert_eq!(extract_arxiv_id("math.GT/0309136v2").unwrap().as_str(), "math.GT/0309136v2");
}

#[test]
fn test_extract_arxiv_id_withUrls_shouldTakePathIdentifier() {
    assert_eq!(extract_arxiv_id("https://arxiv.org/abs/2401.01234").unwrap().as_str(), "2401.01234");
    assert_eq!(extract_arxiv_id("https://arxiv.org/pdf/2401.01234v2.pdf").unwrap().as_str(), "2401.01234v2");
    assert_eq!(extract_arxiv_id("http://export.arxiv.org/abs/hep-th/9901001").unwrap().as_str(), "hep-th/9901001");
}

#[test]
fn test_extract_arxiv_id_withInvalidInput_shouldFail() {
    for input in ["", "hello", "24.1", "https://example.com/abs/2401.01234", "https://arxiv.org/list/cs.CL",
        "https://notarxiv.org/abs/2401.01234", "https://arxiv.org.evil.com/abs/2401.01234"] {
        assert!(
            matches!(extract_arxiv_id(input), Err(FetchError::InvalidIdentifier(_))),
            "expected {:?} to be rejected",
            input
        );
    }
}

#[test]
fn test_file_stem_withOldStyleId_shouldReplaceSlash() {
    let id = extract_arxiv_id("hep-th/9901001").unwrap();
    assert_eq!(id.file_stem(), "hep-th_9901001");
    assert_eq!(id.to_string(), "hep-th/9901001");
}

#[test]
fn test_parse_atom_feed_shouldReadTitleAndSummary() {
    let id = extract_arxiv_id("2401.01234").unwrap();
    let feed = common::atom_feed("2401.01234", "Sparse   Mixtures\n of Experts", "We show that &lt;x&gt; &amp; y.");

    let metadata = parse_atom_feed(&feed, &id).unwrap();

    assert_eq!(metadata.title, "Sparse Mixtures of Experts");
    assert_eq!(metadata.abstract_text, "We show that <x> & y.");
}

#[test]
fn test_parse_atom_feed_withErrorEntry_shouldReportNotFound() {
    let id = extract_arxiv_id("2401.01234").unwrap();
    let result = parse_atom_feed(&common::atom_error_feed(), &id);
    assert!(matches!(result, Err(FetchError::EntryNotFound(_))));
}

#[test]
fn test_parse_atom_feed_withoutEntry_shouldReportNotFound() {
    let id = extract_arxiv_id("2401.01234").unwrap();
    let result = parse_atom_feed("<feed></feed>", &id);
    assert!(matches!(result, Err(FetchError::EntryNotFound(_))));
}

#[test]
fn test_client_urls_shouldUseConfiguredEndpoints() {
    let client = ArxivClient::new(ArxivConfig {
        api_endpoint: "http://localhost:9/api/query".to_string(),
        source_endpoint: "http://localhost:9/src/".to_string(),
        timeout_secs: 5,
    });
    let id = extract_arxiv_id("hep-th/9901001").unwrap();

    let metadata_url = client.metadata_url(&id).unwrap();
    assert_eq!(metadata_url.path(), "/api/query");
    assert!(metadata_url.query().unwrap().contains("id_list=hep-th%2F9901001"));
    assert_eq!(client.source_url(&id), "http://localhost:9/src/hep-th/9901001");
}
