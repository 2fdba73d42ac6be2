//! Streaming multipart upload pipeline.

use std::io;
use std::path::Path;

use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use bytes::BytesMut;
use multer::{Field, Multipart};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::filename::{generated_name, sanitize_file_name};
use super::sniff::{SNIFF_LEN, sniff_content_type};
use super::uploaded_file::UploadedFile;
use crate::fs::ensure_dir;
use crate::{Error, ErrorKind, Result, TRACING_TARGET_UPLOAD, Toolkit};

/// Number of random names tried before giving up on a collision.
const MAX_RENAME_ATTEMPTS: usize = 8;

impl Toolkit {
    /// Stores every file part of a `multipart/form-data` request in `dir`.
    ///
    /// Parts are processed in order, one at a time, and streamed straight
    /// to disk. Form fields without a filename are skipped. With `rename`
    /// set, each file gets a random name that keeps the original extension
    /// (or has none if the client name is unusable); otherwise the sanitized
    /// client filename is used.
    ///
    /// Files stored before a failing part stay on disk; callers needing
    /// all-or-nothing semantics should upload into a staging directory.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::BadRequestBody`] for a missing boundary or malformed framing
    /// - [`ErrorKind::NoFileFound`] if the request has no file part
    /// - [`ErrorKind::UnsupportedFileType`] if a sniffed type is not allowed
    /// - [`ErrorKind::FileTooLarge`] if a file exceeds the upload ceiling
    /// - [`ErrorKind::StorageFailure`] on filesystem errors
    /// - [`ErrorKind::Cancelled`] if the handle's token fires
    #[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display(), rename = rename))]
    pub async fn upload_files(
        &self,
        request: Request,
        dir: impl AsRef<Path>,
        rename: bool,
    ) -> Result<Vec<UploadedFile>> {
        self.process_uploads(request, dir.as_ref(), rename, None)
            .await
    }

    /// Stores the single file part of a `multipart/form-data` request.
    ///
    /// Behaves like [`Toolkit::upload_files`] but requires exactly one file
    /// part: a second file part is rejected before any of its bytes are
    /// written.
    ///
    /// # Errors
    ///
    /// Same as [`Toolkit::upload_files`], plus [`ErrorKind::BadRequestBody`]
    /// when more than one file part is present.
    #[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display(), rename = rename))]
    pub async fn upload_one_file(
        &self,
        request: Request,
        dir: impl AsRef<Path>,
        rename: bool,
    ) -> Result<UploadedFile> {
        self.process_uploads(request, dir.as_ref(), rename, Some(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ErrorKind::NoFileFound.into_error())
    }

    async fn process_uploads(
        &self,
        request: Request,
        dir: &Path,
        rename: bool,
        max_files: Option<usize>,
    ) -> Result<Vec<UploadedFile>> {
        let mut multipart = open_multipart(request)?;
        let mut uploaded = Vec::new();

        while let Some(field) = self
            .guard(multipart.next_field())
            .await?
            .map_err(multipart_error)?
        {
            // Browsers send an empty filename for an unused file input.
            let original_name = field.file_name().filter(|name| !name.is_empty());
            let Some(original_name) = original_name.map(str::to_owned) else {
                tracing::trace!(
                    target: TRACING_TARGET_UPLOAD,
                    field = field.name().unwrap_or_default(),
                    "skipping field without filename"
                );
                continue;
            };

            if max_files.is_some_and(|max| uploaded.len() >= max) {
                return Err(ErrorKind::BadRequestBody
                    .with_message("expected a single file")
                    .with_context(original_name));
            }

            let file = self.store_field(field, original_name, dir, rename).await?;
            tracing::debug!(
                target: TRACING_TARGET_UPLOAD,
                original_name = %file.original_name,
                stored_name = %file.stored_name,
                content_type = %file.content_type,
                size = file.size_bytes,
                "file stored"
            );
            uploaded.push(file);
        }

        if uploaded.is_empty() {
            return Err(ErrorKind::NoFileFound.into_error());
        }

        Ok(uploaded)
    }

    async fn store_field(
        &self,
        mut field: Field<'static>,
        original_name: String,
        dir: &Path,
        rename: bool,
    ) -> Result<UploadedFile> {
        let head = self.read_head(&mut field).await?;

        let content_type = sniff_content_type(&head);
        if !self.config().is_file_type_allowed(content_type) {
            return Err(ErrorKind::UnsupportedFileType
                .with_message(format!("uploaded file type '{content_type}' is not permitted"))
                .with_context(original_name));
        }

        // Unusable client names only matter when they are kept.
        let sanitized = match sanitize_file_name(&original_name) {
            Some(sanitized) => sanitized,
            None if rename => String::new(),
            None => {
                return Err(ErrorKind::BadRequestBody
                    .with_message("invalid file name")
                    .with_context(original_name));
            }
        };

        ensure_dir(dir).await?;
        let (stored_name, mut file) = create_file(dir, &sanitized, rename).await?;
        let path = dir.join(&stored_name);

        match self.write_field(&mut file, &head, &mut field).await {
            Ok(size_bytes) => Ok(UploadedFile {
                original_name,
                stored_name,
                size_bytes,
                content_type: content_type.to_owned(),
            }),
            Err(err) => {
                drop(file);
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(
                        target: TRACING_TARGET_UPLOAD,
                        path = %path.display(),
                        error = %remove_err,
                        "failed to remove partially written file"
                    );
                }
                Err(err)
            }
        }
    }

    /// Buffers at least [`SNIFF_LEN`] bytes of `field`, or all of it if shorter.
    async fn read_head(&self, field: &mut Field<'static>) -> Result<BytesMut> {
        let mut head = BytesMut::with_capacity(SNIFF_LEN);

        while head.len() < SNIFF_LEN {
            match self.guard(field.chunk()).await?.map_err(multipart_error)? {
                Some(chunk) => head.extend_from_slice(&chunk),
                None => break,
            }
        }

        Ok(head)
    }

    /// Writes `head` and the rest of `field` into `file`, returning the size.
    async fn write_field(
        &self,
        file: &mut File,
        head: &[u8],
        field: &mut Field<'static>,
    ) -> Result<u64> {
        let mut written = 0;
        self.write_chunk(file, head, &mut written).await?;

        while let Some(chunk) = self.guard(field.chunk()).await?.map_err(multipart_error)? {
            self.write_chunk(file, &chunk, &mut written).await?;
        }

        self.guard(file.flush())
            .await?
            .map_err(|err| Error::storage("failed to flush file", err))?;
        file.sync_all()
            .await
            .map_err(|err| Error::storage("failed to sync file", err))?;

        Ok(written)
    }

    async fn write_chunk(&self, file: &mut File, chunk: &[u8], written: &mut u64) -> Result<()> {
        let limit = self.config().max_upload_size;
        let next = *written + chunk.len() as u64;
        if next > limit {
            return Err(ErrorKind::FileTooLarge
                .with_message("uploaded file is too big")
                .with_context(format!("maximum size is {limit} bytes")));
        }

        self.guard(file.write_all(chunk))
            .await?
            .map_err(|err| Error::storage("failed to write file", err))?;
        *written = next;

        Ok(())
    }
}

/// Opens a streaming multipart reader over the request body.
fn open_multipart(request: Request) -> Result<Multipart<'static>> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            ErrorKind::BadRequestBody
                .with_message("missing multipart content type")
                .with_context("expected multipart/form-data with a boundary")
        })?;

    let boundary = multer::parse_boundary(content_type).map_err(|err| {
        ErrorKind::BadRequestBody
            .with_message("invalid multipart boundary")
            .with_context(err.to_string())
            .with_source(err)
    })?;

    Ok(Multipart::new(request.into_body().into_data_stream(), boundary))
}

fn multipart_error(err: multer::Error) -> Error {
    ErrorKind::BadRequestBody
        .with_message("invalid multipart data")
        .with_context(err.to_string())
        .with_source(err)
}

/// Creates the destination file without overwriting anything.
async fn create_file(dir: &Path, sanitized: &str, rename: bool) -> Result<(String, File)> {
    let attempts = if rename { MAX_RENAME_ATTEMPTS } else { 1 };
    let mut last_err = None;

    for _ in 0..attempts {
        let name = if rename {
            generated_name(sanitized)
        } else {
            sanitized.to_owned()
        };

        let opened = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&name))
            .await;

        match opened {
            Ok(file) => return Ok((name, file)),
            Err(err) if rename && err.kind() == io::ErrorKind::AlreadyExists => {
                last_err = Some(err);
            }
            Err(err) => {
                return Err(Error::storage("failed to create file", err).with_context(name));
            }
        }
    }

    let err = last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists));
    Err(Error::storage("failed to create file", err).with_context(sanitized.to_owned()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use bytes::Bytes;
    use futures::channel::mpsc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::ToolkitConfig;
    use crate::upload::filename::GENERATED_NAME_LENGTH;

    const BOUNDARY: &str = "reqkit-test-boundary";

    /// A part of a multipart test body.
    struct Part<'a> {
        field: &'a str,
        file_name: Option<&'a str>,
        content_type: &'a str,
        data: Vec<u8>,
    }

    impl<'a> Part<'a> {
        fn file(file_name: &'a str, content_type: &'a str, data: Vec<u8>) -> Self {
            Self {
                field: "file",
                file_name: Some(file_name),
                content_type,
                data,
            }
        }

        fn text(field: &'a str, value: &str) -> Self {
            Self {
                field,
                file_name: None,
                content_type: "text/plain",
                data: value.as_bytes().to_vec(),
            }
        }
    }

    fn png_bytes(len: usize) -> Vec<u8> {
        let mut data = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
        data.resize(len.max(data.len()), 0x42);
        data
    }

    fn multipart_request(parts: &[Part<'_>]) -> Request {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let disposition = match part.file_name {
                Some(file_name) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.field, file_name
                ),
                None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.field),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("valid test request")
    }

    fn toolkit_allowing(types: &[&str]) -> Toolkit {
        Toolkit::new(ToolkitConfig::new().with_allowed_file_types(types.iter().copied()))
    }

    #[tokio::test]
    async fn upload_allowed_without_rename() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let toolkit = toolkit_allowing(&["image/jpeg", "image/png"]);
        let request = multipart_request(&[Part::file("img.png", "image/png", png_bytes(2048))]);

        let files = toolkit.upload_files(request, temp.path(), false).await?;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].original_name, "img.png");
        assert_eq!(files[0].stored_name, "img.png");
        assert_eq!(files[0].size_bytes, 2048);
        assert_eq!(files[0].content_type, "image/png");
        assert_eq!(std::fs::read(files[0].path_in(temp.path()))?, png_bytes(2048));
        Ok(())
    }

    #[tokio::test]
    async fn upload_allowed_with_rename() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let toolkit = toolkit_allowing(&["image/jpeg", "image/png"]);
        let request = multipart_request(&[Part::file("img.png", "image/png", png_bytes(64))]);

        let files = toolkit.upload_files(request, temp.path(), true).await?;

        assert_ne!(files[0].stored_name, "img.png");
        assert!(files[0].stored_name.ends_with(".png"));
        assert!(files[0].path_in(temp.path()).is_file());
        Ok(())
    }

    #[tokio::test]
    async fn upload_not_allowed() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let toolkit = toolkit_allowing(&["image/jpeg"]);
        let request = multipart_request(&[Part::file("img.png", "image/jpeg", png_bytes(64))]);

        let error = toolkit
            .upload_files(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnsupportedFileType);
        assert!(!temp.path().join("img.png").exists());
        Ok(())
    }

    #[tokio::test]
    async fn upload_ignores_declared_content_type() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let toolkit = toolkit_allowing(&["image/png"]);
        let request = multipart_request(&[Part::file(
            "fake.png",
            "image/png",
            b"#!/bin/sh\necho pwned\n".to_vec(),
        )]);

        let error = toolkit
            .upload_files(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnsupportedFileType);
        Ok(())
    }

    #[tokio::test]
    async fn upload_keeps_files_written_before_violation() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let toolkit = toolkit_allowing(&["image/png"]);
        let request = multipart_request(&[
            Part::file("first.png", "image/png", png_bytes(64)),
            Part::file("second.txt", "image/png", b"plain text".to_vec()),
            Part::file("third.png", "image/png", png_bytes(64)),
        ]);

        let error = toolkit
            .upload_files(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnsupportedFileType);
        assert!(temp.path().join("first.png").is_file());
        assert!(!temp.path().join("third.png").exists());
        Ok(())
    }

    #[tokio::test]
    async fn upload_multiple_files_and_skip_form_fields() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let toolkit = Toolkit::default();
        let request = multipart_request(&[
            Part::text("title", "holiday pictures"),
            Part::file("a.png", "image/png", png_bytes(700)),
            Part::file("notes.txt", "text/plain", b"remember the sunscreen".to_vec()),
        ]);

        let files = toolkit.upload_files(request, temp.path(), false).await?;

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].stored_name, "a.png");
        assert_eq!(files[0].size_bytes, 700);
        assert_eq!(files[1].stored_name, "notes.txt");
        assert_eq!(files[1].content_type, "text/plain");
        Ok(())
    }

    #[tokio::test]
    async fn upload_too_large_removes_partial_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let toolkit = Toolkit::new(ToolkitConfig::new().with_max_upload_size(1024));
        let request = multipart_request(&[Part::file("big.png", "image/png", png_bytes(4096))]);

        let error = toolkit
            .upload_files(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::FileTooLarge);
        assert!(!temp.path().join("big.png").exists());
        Ok(())
    }

    #[tokio::test]
    async fn upload_without_files() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let request = multipart_request(&[Part::text("title", "nothing attached")]);

        let error = Toolkit::default()
            .upload_files(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NoFileFound);
        Ok(())
    }

    #[tokio::test]
    async fn upload_without_boundary() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let request = HttpRequest::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))?;

        let error = Toolkit::default()
            .upload_files(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::BadRequestBody);
        Ok(())
    }

    #[tokio::test]
    async fn upload_creates_directory_idempotently() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().join("uploads").join("images");
        let toolkit = Toolkit::default();

        for _ in 0..2 {
            let request = multipart_request(&[Part::file("img.png", "image/png", png_bytes(64))]);
            toolkit.upload_files(request, &dir, true).await?;
        }

        assert_eq!(std::fs::read_dir(&dir)?.count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn upload_does_not_overwrite_existing_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        std::fs::write(temp.path().join("img.png"), b"existing")?;
        let request = multipart_request(&[Part::file("img.png", "image/png", png_bytes(64))]);

        let error = Toolkit::default()
            .upload_files(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::StorageFailure);
        assert_eq!(error.io_kind(), Some(io::ErrorKind::AlreadyExists));
        assert_eq!(std::fs::read(temp.path().join("img.png"))?, b"existing");
        Ok(())
    }

    #[tokio::test]
    async fn upload_one_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let request = multipart_request(&[Part::file("img.png", "image/png", png_bytes(64))]);

        let file = Toolkit::default()
            .upload_one_file(request, temp.path(), true)
            .await?;

        assert!(file.path_in(temp.path()).is_file());
        Ok(())
    }

    #[tokio::test]
    async fn upload_one_file_rejects_second_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let request = multipart_request(&[
            Part::file("a.png", "image/png", png_bytes(64)),
            Part::file("b.png", "image/png", png_bytes(64)),
        ]);

        let error = Toolkit::default()
            .upload_one_file(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::BadRequestBody);
        assert!(!temp.path().join("b.png").exists());
        Ok(())
    }

    #[tokio::test]
    async fn upload_renames_unusable_file_name() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let request = multipart_request(&[Part::file("..", "image/png", png_bytes(64))]);

        let file = Toolkit::default()
            .upload_one_file(request, temp.path(), true)
            .await?;

        assert_eq!(file.original_name, "..");
        assert_eq!(file.stored_name.len(), GENERATED_NAME_LENGTH);
        assert!(!file.stored_name.contains('.'));
        assert!(file.path_in(temp.path()).is_file());
        Ok(())
    }

    #[tokio::test]
    async fn upload_keeps_rejecting_unusable_name_without_rename() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let request = multipart_request(&[Part::file("..", "image/png", png_bytes(64))]);

        let error = Toolkit::default()
            .upload_one_file(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::BadRequestBody);
        Ok(())
    }

    #[tokio::test]
    async fn upload_cancelled_mid_transfer_removes_partial_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let token = CancellationToken::new();
        let toolkit = Toolkit::default().with_cancellation(token.clone());

        // First chunk carries the part headers and more than the sniff window,
        // then the stream stalls until the token fires.
        let mut head = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"slow.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        head.extend_from_slice(&png_bytes(4 * SNIFF_LEN));

        let (sender, receiver) = mpsc::unbounded::<Result<Bytes, io::Error>>();
        sender.unbounded_send(Ok(Bytes::from(head)))?;

        let request = HttpRequest::builder()
            .method("POST")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from_stream(receiver))?;

        let dir = temp.path().to_owned();
        let upload = tokio::spawn(async move { toolkit.upload_files(request, dir, false).await });

        let partial = temp.path().join("slow.png");
        for _ in 0..500 {
            if partial.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(partial.exists(), "upload never started writing");

        token.cancel();
        let error = upload.await?.unwrap_err();
        drop(sender);

        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert!(!partial.exists());
        Ok(())
    }

    #[tokio::test]
    async fn upload_cancelled() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let token = CancellationToken::new();
        let toolkit = Toolkit::default().with_cancellation(token.clone());
        token.cancel();

        let request = multipart_request(&[Part::file("img.png", "image/png", png_bytes(64))]);
        let error = toolkit
            .upload_files(request, temp.path(), false)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert!(!temp.path().join("img.png").exists());
        Ok(())
    }
}
