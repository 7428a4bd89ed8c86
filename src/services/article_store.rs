// Content article lookup
// Articles share the slug namespace with affiliate links and are consulted second

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::{
    models::article::Article,
    services::cloud_client::{CloudClient, StoreError},
};

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError>;
}

pub struct CloudArticleStore {
    client: CloudClient,
}

impl CloudArticleStore {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArticleStore for CloudArticleStore {
    #[instrument(skip(self))]
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError> {
        self.client.get(&["articles", "slug", slug]).await
    }
}

#[derive(Default)]
pub struct InMemoryArticleStore {
    articles: RwLock<HashMap<String, Article>>,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        Self {
            articles: RwLock::new(
                articles
                    .into_iter()
                    .map(|article| (article.slug.clone(), article))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ArticleStore for InMemoryArticleStore {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError> {
        Ok(self.articles.read().await.get(slug).cloned())
    }
}
