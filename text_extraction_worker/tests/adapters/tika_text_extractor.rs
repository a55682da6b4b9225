use std::{path::PathBuf, time::Duration};

use claims::{assert_err, assert_ok};
use tempfile::TempDir;
use text_extraction_worker::{
    adapters::tika_text_extractor::TikaTextExtractor,
    ports::text_extractor::{TextExtractionError, TextExtractor},
};
use wiremock::{
    matchers::{body_bytes, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const PDF_CONTENT: &[u8] = b"%PDF-1.4 fake content";

fn write_pdf(directory: &TempDir) -> PathBuf {
    let file_path = directory.path().join("book.pdf");
    std::fs::write(&file_path, PDF_CONTENT).unwrap();
    file_path
}

#[tokio::test]
async fn extract_text_sends_the_file_to_tika_and_returns_the_plain_text() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/tika"))
        .and(header("Accept", "text/plain"))
        .and(header("Content-Type", "application/pdf"))
        .and(body_bytes(PDF_CONTENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("Once upon a time"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = TempDir::new().unwrap();
    let file_path = write_pdf(&directory);
    let extractor = TikaTextExtractor::try_new(&mock_server.uri(), Duration::from_secs(5)).unwrap();

    // Act
    let text = assert_ok!(extractor.extract_text(&file_path).await);

    // Assert
    assert_eq!(text, "Once upon a time");
}

#[tokio::test]
async fn a_trailing_slash_in_the_base_url_is_ignored() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/tika"))
        .respond_with(ResponseTemplate::new(200).set_body_string("text"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = TempDir::new().unwrap();
    let file_path = write_pdf(&directory);
    let base_url = format!("{}/", mock_server.uri());
    let extractor = TikaTextExtractor::try_new(&base_url, Duration::from_secs(5)).unwrap();

    assert_eq!(extractor.base_url(), mock_server.uri());
    assert_ok!(extractor.extract_text(&file_path).await);
}

#[tokio::test]
async fn a_non_200_status_is_an_error() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/tika"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = TempDir::new().unwrap();
    let file_path = write_pdf(&directory);
    let extractor = TikaTextExtractor::try_new(&mock_server.uri(), Duration::from_secs(5)).unwrap();

    // Act
    let error = assert_err!(extractor.extract_text(&file_path).await);

    // Assert
    assert!(matches!(error, TextExtractionError::UnexpectedStatus(500)));
}

#[tokio::test]
async fn a_missing_file_fails_without_calling_tika() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let directory = TempDir::new().unwrap();
    let file_path = directory.path().join("missing.pdf");
    let extractor = TikaTextExtractor::try_new(&mock_server.uri(), Duration::from_secs(5)).unwrap();

    // Act
    let error = assert_err!(extractor.extract_text(&file_path).await);

    // Assert
    assert!(matches!(error, TextExtractionError::FileRead(_, _)));
}

#[tokio::test]
async fn a_response_slower_than_the_timeout_is_an_error() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/tika"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let directory = TempDir::new().unwrap();
    let file_path = write_pdf(&directory);
    let extractor =
        TikaTextExtractor::try_new(&mock_server.uri(), Duration::from_millis(200)).unwrap();

    // Act
    let error = assert_err!(extractor.extract_text(&file_path).await);

    // Assert
    assert!(matches!(error, TextExtractionError::Request(ref e) if e.is_timeout()));
}
