//! Read-time ordering of news and comment threads.

use crate::{
    error::RepoError,
    models::{Comment, NewsItem},
    repository::Repository,
};

/// home_page
///
/// At most `limit` news items, most recent first. Items sharing a date keep
/// the order in which the store returned them.
pub async fn home_page(repo: &dyn Repository, limit: usize) -> Result<Vec<NewsItem>, RepoError> {
    let mut news = repo.list_news(limit).await?;
    newest_first(&mut news);
    news.truncate(limit);
    Ok(news)
}

/// thread
///
/// Every comment of one news item, oldest first. Never truncated.
pub async fn thread(repo: &dyn Repository, news_id: i64) -> Result<Vec<Comment>, RepoError> {
    let mut comments = repo.list_comments(news_id).await?;
    oldest_first(&mut comments);
    Ok(comments)
}

// Both sorts are stable, so equal keys keep their incoming order.

pub fn newest_first(news: &mut [NewsItem]) {
    news.sort_by(|a, b| b.date.cmp(&a.date));
}

pub fn oldest_first(comments: &mut [Comment]) {
    comments.sort_by_key(|comment| comment.created);
}
