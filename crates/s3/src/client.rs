//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from bkt-core for a
//! single bucket.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use bkt_core::{
    BytesTransferred, DeleteFailure, DeleteResult, Error, ListOptions, ListResult, ObjectInfo,
    ObjectStore, Result,
};
use bytes::Bytes;
use jiff::Timestamp;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Files at or above this size are uploaded in parts
pub const MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Size of each multipart part except the last
pub const PART_SIZE: u64 = 8 * 1024 * 1024;

/// Where and how to reach the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Custom endpoint for S3-compatible stores; AWS when unset
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    /// auto, path or dns
    pub bucket_lookup: String,
}

/// S3 client bound to one bucket
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from a store configuration and resolved credentials
    pub async fn new(
        config: StoreConfig,
        credentials: aws_credential_types::Credentials,
    ) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(Error::Config("No bucket configured".to_string()));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // Path-style addressing unless DNS lookup is requested explicitly
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.bucket_lookup == "path" || config.bucket_lookup == "auto")
            .build();

        tracing::debug!(
            bucket = %config.bucket,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            region = %config.region,
            "Created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket,
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &SdkError<E>) -> String {
        match error {
            SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let meta = service_err.raw();
                let mut msg = format!("Service error: {}", err);
                if let Some(code) = meta.headers().get("x-amz-error-code") {
                    msg.push_str(&format!(" (code: {})", code));
                }
                msg
            }
            SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {:?}", err)
            }
            SdkError::TimeoutError(_) => "Request timeout".to_string(),
            SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {:?}", err)
            }
            SdkError::ResponseError(err) => {
                format!("Response error: {:?}", err)
            }
            _ => error.to_string(),
        }
    }

    /// Map an SDK failure to the error kind the CLI reports
    fn map_sdk_error<E>(error: &SdkError<E>, context: &str) -> Error
    where
        E: ProvideErrorMetadata + std::fmt::Display,
    {
        let status = match error {
            SdkError::ServiceError(service_err) => Some(service_err.raw().status().as_u16()),
            _ => None,
        };
        let message = format!("{context}: {}", Self::format_sdk_error(error));
        classify(error.code(), status, message)
    }

    async fn put_single(
        &self,
        key: &str,
        path: &Path,
        size: u64,
        progress: &dyn BytesTransferred,
    ) -> Result<u64> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| Error::General(format!("Cannot read {}: {e}", path.display())))?;

        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type_for(key))
            .body(body)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("put {key}")))?;

        progress.on_bytes_transferred(size);
        Ok(size)
    }

    async fn put_multipart(
        &self,
        key: &str,
        path: &Path,
        size: u64,
        progress: &dyn BytesTransferred,
    ) -> Result<u64> {
        let created = self
            .inner
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type_for(key))
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("start multipart upload of {key}")))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| Error::General(format!("No upload id returned for {key}")))?
            .to_string();

        tracing::debug!(key, size, parts = part_count(size), "Started multipart upload");

        match self.upload_parts(key, path, size, &upload_id, progress).await {
            Ok(()) => Ok(size),
            Err(e) => {
                if let Err(abort_err) = self
                    .inner
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        key,
                        upload_id = %upload_id,
                        error = %Self::format_sdk_error(&abort_err),
                        "Failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        path: &Path,
        size: u64,
        upload_id: &str,
        progress: &dyn BytesTransferred,
    ) -> Result<()> {
        let parts = send_parts(path, size, progress, |number, body| {
            self.upload_part(key, upload_id, number, body)
        })
        .await?;

        self.inner
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("complete multipart upload of {key}")))?;

        Ok(())
    }

    /// Send one part and return its ETag
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<Option<String>> {
        let response = self
            .inner
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                Self::map_sdk_error(&e, &format!("upload part {part_number} of {key}"))
            })?;

        Ok(response.e_tag().map(str::to_string))
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(&self, options: ListOptions) -> Result<ListResult> {
        let response = self
            .inner
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(options.prefix)
            .set_max_keys(options.max_keys)
            .set_continuation_token(options.continuation_token)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("list bucket {}", self.bucket)))?;

        let items = response
            .contents()
            .iter()
            .map(|object| {
                let size = object.size().unwrap_or(0).max(0) as u64;
                let mut info = ObjectInfo::new(object.key().unwrap_or_default(), size);
                info.last_modified = object.last_modified().and_then(to_timestamp);
                info.etag = object.e_tag().map(|etag| etag.trim_matches('"').to_string());
                info
            })
            .collect();

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        progress: &dyn BytesTransferred,
    ) -> Result<u64> {
        let size = tokio::fs::metadata(path).await?.len();
        if size < MULTIPART_THRESHOLD {
            self.put_single(key, path, size, progress).await
        } else {
            self.put_multipart(key, path, size, progress).await
        }
    }

    async fn get_file(
        &self,
        key: &str,
        path: &Path,
        progress: &dyn BytesTransferred,
    ) -> Result<u64> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("get {key}")))?;

        let body = response.body;
        write_via_partial(path, |partial| async move {
            stream_to_file(body, key, &partial, progress).await
        })
        .await
    }

    async fn delete_objects(&self, keys: Vec<String>) -> Result<DeleteResult> {
        if keys.is_empty() {
            return Ok(DeleteResult::default());
        }

        let objects = keys
            .iter()
            .map(|k| {
                ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| Error::General(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("delete {} objects", keys.len())))?;

        let deleted = response
            .deleted()
            .iter()
            .filter_map(|d| d.key().map(|k| k.to_string()))
            .collect();

        let errors = response
            .errors()
            .iter()
            .map(|e| DeleteFailure {
                key: e.key().unwrap_or_default().to_string(),
                message: e
                    .message()
                    .or(e.code())
                    .unwrap_or("unknown error")
                    .to_string(),
            })
            .collect();

        Ok(DeleteResult { deleted, errors })
    }
}

/// Pick the error kind from the service error code and HTTP status
fn classify(code: Option<&str>, status: Option<u16>, message: String) -> Error {
    match (code, status) {
        (Some("NoSuchKey" | "NoSuchBucket" | "NotFound"), _) | (_, Some(404)) => {
            Error::NotFound(message)
        }
        (
            Some(
                "AccessDenied"
                | "InvalidAccessKeyId"
                | "SignatureDoesNotMatch"
                | "ExpiredToken"
                | "InvalidToken",
            ),
            _,
        )
        | (_, Some(401 | 403)) => Error::Auth(message),
        _ => Error::Network(message),
    }
}

fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Number of parts a multipart upload of `size` bytes uses
fn part_count(size: u64) -> u64 {
    size.div_ceil(PART_SIZE).max(1)
}

/// One part of a multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartPlan {
    /// 1-based, as S3 numbers parts
    number: i32,
    offset: u64,
    len: u64,
}

/// Split `size` bytes into [`PART_SIZE`] parts; only the last may be shorter
fn plan_parts(size: u64) -> Vec<PartPlan> {
    (0..part_count(size))
        .map(|index| {
            let offset = index * PART_SIZE;
            PartPlan {
                number: index as i32 + 1,
                offset,
                len: (size - offset).min(PART_SIZE),
            }
        })
        .collect()
}

/// Read `path` part by part and hand each one to `send`
///
/// Progress advances by a part's length once `send` accepts it. The first
/// failure stops the loop; a file that shrank since `size` was taken fails
/// with an I/O error instead of completing a short upload.
async fn send_parts<F, Fut>(
    path: &Path,
    size: u64,
    progress: &dyn BytesTransferred,
    mut send: F,
) -> Result<Vec<CompletedPart>>
where
    F: FnMut(i32, Bytes) -> Fut,
    Fut: Future<Output = Result<Option<String>>>,
{
    let mut file = tokio::fs::File::open(path).await?;
    let mut parts = Vec::new();

    for part in plan_parts(size) {
        let mut chunk = vec![0u8; part.len as usize];
        file.read_exact(&mut chunk).await?;
        tracing::trace!(
            part = part.number,
            offset = part.offset,
            len = part.len,
            "Sending part"
        );

        let e_tag = send(part.number, Bytes::from(chunk)).await?;
        parts.push(
            CompletedPart::builder()
                .part_number(part.number)
                .set_e_tag(e_tag)
                .build(),
        );
        progress.on_bytes_transferred(part.len);
    }

    Ok(parts)
}

/// Name of the sibling file a download is written to before it replaces `path`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".bkt-part");
    path.with_file_name(name)
}

/// Run `write` against a sibling of `path`, then rename it into place
///
/// An existing file at `path` is only replaced once `write` succeeds; on
/// failure the partial file is removed and `path` is left as it was.
async fn write_via_partial<F, Fut>(path: &Path, write: F) -> Result<u64>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    let partial = partial_path(path);
    let result = match write(partial.clone()).await {
        Ok(written) => tokio::fs::rename(&partial, path)
            .await
            .map(|()| written)
            .map_err(Error::from),
        Err(e) => Err(e),
    };

    if result.is_err()
        && let Err(remove_err) = tokio::fs::remove_file(&partial).await
    {
        tracing::debug!(
            path = %partial.display(),
            error = %remove_err,
            "Could not remove partial download"
        );
    }
    result
}

async fn stream_to_file(
    mut body: ByteStream,
    key: &str,
    path: &Path,
    progress: &dyn BytesTransferred,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = body
        .try_next()
        .await
        .map_err(|e| Error::Network(format!("read body of {key}: {e}")))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        progress.on_bytes_transferred(chunk.len() as u64);
    }

    file.flush().await?;
    Ok(written)
}

fn to_timestamp(time: &aws_smithy_types::DateTime) -> Option<Timestamp> {
    Timestamp::from_second(time.secs()).ok()
}
