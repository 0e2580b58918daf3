use crate::{
    AppState,
    handlers::{news, notes},
};
use axum::{
    Router,
    routing::get,
};

/// Authenticated Router Module
///
/// Every route here is wrapped by the `require_login` layer in `create_router`,
/// so anonymous visitors are redirected to the login page with `next` set,
/// whether or not the addressed note or comment exists. Handlers then apply the
/// owner check, which answers 404 to anyone but the owner.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Notes ---
        // GET /notes/list/
        // The requester's own notes.
        .route("/notes/list/", get(notes::note_list))
        // GET/POST /notes/add/
        .route("/notes/add/", get(notes::add_note_form).post(notes::add_note))
        // GET /notes/done/
        // Landing page after any successful note change.
        .route("/notes/done/", get(notes::note_success))
        // GET /notes/note/{slug}/
        .route("/notes/note/{slug}/", get(notes::note_detail))
        // GET/POST /notes/edit/{slug}/
        .route(
            "/notes/edit/{slug}/",
            get(notes::edit_note_form).post(notes::edit_note),
        )
        // GET/POST/DELETE /notes/delete/{slug}/
        // GET shows the confirmation; POST and DELETE both delete.
        .route(
            "/notes/delete/{slug}/",
            get(notes::delete_note_confirm)
                .post(notes::delete_note)
                .delete(notes::delete_note),
        )
        // --- Comments ---
        // GET/POST /edit_comment/{id}/
        .route(
            "/edit_comment/{id}/",
            get(news::edit_comment_form).post(news::edit_comment),
        )
        // GET/POST /delete_comment/{id}/
        .route(
            "/delete_comment/{id}/",
            get(news::delete_comment_confirm).post(news::delete_comment),
        )
}
