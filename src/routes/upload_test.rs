use super::*;

#[test]
fn sanitize_keeps_safe_characters() {
    assert_eq!(sanitize_filename("notes-v2.txt"), "notes-v2.txt");
    assert_eq!(sanitize_filename("my file (1).png"), "my_file__1_.png");
    assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
    assert_eq!(sanitize_filename("héllo.png"), "h_llo.png");
}

#[test]
fn upload_errors_map_to_http_statuses() {
    let response = UploadError::MissingFile.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = UploadError::Multipart("truncated".into()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = UploadError::Io(std::io::Error::other("disk full")).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn upload_error_messages_are_stable() {
    assert_eq!(UploadError::MissingFile.to_string(), "file upload failed");
}
