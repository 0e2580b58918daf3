/// Router Module Index
///
/// Splits the routing table by who may reach a route. Anonymous visitors are
/// turned away from `authenticated` routes before any lookup happens;
/// ownership is then checked per resource inside the handlers.

/// Routes reachable by everyone: the news feed and detail page, the notes
/// landing page and the auth pages.
pub mod public;

/// Routes behind the `require_login` layer: notes and comment edit/delete.
pub mod authenticated;
