// src/store/mongo.rs
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

use super::{InsertOutcome, PageQuery, StoreError, TitleFilter, Video, VideoStore};

pub const DEFAULT_DATABASE: &str = "video_catalog";
pub const DEFAULT_COLLECTION: &str = "videos";

/// Server error code for a unique-index violation.
const DUPLICATE_KEY: i32 = 11000;

/// On-disk shape. The provider id is the document `_id`, which MongoDB indexes as unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VideoDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    publish_date: String,
    #[serde(default)]
    thumbnail_url: String,
    #[serde(default)]
    channel_name: String,
}

impl From<&Video> for VideoDocument {
    fn from(v: &Video) -> Self {
        Self {
            id: v.id.clone(),
            title: v.title.clone(),
            description: v.description.clone(),
            publish_date: v.publish_date.clone(),
            thumbnail_url: v.thumbnail_url.clone(),
            channel_name: v.channel_name.clone(),
        }
    }
}

impl From<VideoDocument> for Video {
    fn from(d: VideoDocument) -> Self {
        Self {
            id: d.id,
            title: d.title,
            description: d.description,
            publish_date: d.publish_date,
            thumbnail_url: d.thumbnail_url,
            channel_name: d.channel_name,
        }
    }
}

pub struct MongoStore {
    client: Client,
    database: String,
    videos: Collection<VideoDocument>,
}

impl MongoStore {
    /// Builds the client. Connection is lazy, so an unreachable server shows up
    /// on the first operation (and on `ping`), not here.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .context("parsing MongoDB connection string")?;
        options.app_name = Some("video-catalog".to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options).context("building MongoDB client")?;
        let videos = client.database(database).collection(collection);

        Ok(Self {
            client,
            database: database.to_string(),
            videos,
        })
    }

    /// Secondary index backing the `publish_date` sort. Safe to call repeatedly.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let model = IndexModel::builder()
            .keys(doc! {"publish_date": -1})
            .build();
        self.videos
            .create_index(model, None)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

fn title_clause(filter: Option<&TitleFilter>) -> Option<Document> {
    filter.map(|f| doc! {"title": doc! {"$regex": f.regex_pattern(), "$options": "i"}})
}

/// Sort and window for one page. `None` when the offset does not fit the
/// server's signed 64-bit skip; no collection is that large, so the page is empty.
fn page_options(query: &PageQuery) -> Option<FindOptions> {
    let skip = i64::try_from(query.skip).ok()?;
    Some(
        FindOptions::builder()
            .sort(doc! {"publish_date": -1, "_id": 1})
            .skip(skip as u64)
            .limit(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .build(),
    )
}

fn classify(err: MongoError) -> StoreError {
    match *err.kind {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl VideoStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "MongoDB"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database(&self.database)
            .run_command(doc! {"ping": 1}, None)
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let found = self
            .videos
            .find_one(doc! {"_id": id}, None)
            .await
            .map_err(classify)?;
        Ok(found.is_some())
    }

    async fn insert(&self, video: &Video) -> Result<InsertOutcome, StoreError> {
        match self.videos.insert_one(VideoDocument::from(video), None).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_duplicate_key(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(classify(e)),
        }
    }

    async fn find_page(&self, query: &PageQuery) -> Result<Vec<Video>, StoreError> {
        let Some(options) = page_options(query) else {
            return Ok(Vec::new());
        };

        let docs: Vec<VideoDocument> = self
            .videos
            .find(title_clause(query.filter.as_ref()), options)
            .await
            .map_err(classify)?
            .try_collect()
            .await
            .map_err(classify)?;

        Ok(docs.into_iter().map(Video::from).collect())
    }

    async fn count(&self, filter: Option<&TitleFilter>) -> Result<u64, StoreError> {
        self.videos
            .count_documents(title_clause(filter), None)
            .await
            .map_err(classify)
    }
}
