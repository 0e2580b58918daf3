use chrono::NaiveDate;
use serde_json::json;
use ya_portal::models::{
    CommentForm, CommentFormContext, NewsDetailPage, NewsItem, NoteForm, NoteFormContext,
};

fn news() -> NewsItem {
    NewsItem {
        id: 1,
        title: "Заголовок".to_string(),
        text: "Текст".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    }
}

// --- Tests ---

#[test]
fn test_news_detail_without_form_omits_the_key() {
    let page = NewsDetailPage {
        news: news(),
        comments: vec![],
        form: None,
    };

    let value = serde_json::to_value(&page).unwrap();
    assert!(value.get("form").is_none());
    assert_eq!(value["news"]["date"], "2024-01-31");
}

#[test]
fn test_news_detail_with_form_has_empty_errors() {
    let page = NewsDetailPage {
        news: news(),
        comments: vec![],
        form: Some(CommentFormContext::default()),
    };

    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["form"], json!({ "data": { "text": "" }, "errors": {} }));
}

#[test]
fn test_note_form_fields_default_to_empty() {
    let form: NoteForm = serde_json::from_value(json!({ "title": "Только заголовок" })).unwrap();

    assert_eq!(form.title, "Только заголовок");
    assert!(form.text.is_empty());
    assert!(form.slug.is_empty());
}

#[test]
fn test_form_errors_serialize_per_field() {
    let mut context = NoteFormContext::default();
    context
        .errors
        .insert("slug".to_string(), vec!["занят".to_string()]);

    let value = serde_json::to_value(&context).unwrap();
    assert_eq!(value["errors"], json!({ "slug": ["занят"] }));
    assert_eq!(value["data"]["title"], "");
}

#[test]
fn test_comment_form_ignores_unknown_fields() {
    let form: CommentForm =
        serde_json::from_value(json!({ "text": "Текст", "csrf": "token" })).unwrap();
    assert_eq!(form.text, "Текст");
}
