//! JSON REST API under `/api`.

pub mod cards;
pub mod contact;
pub mod pagination;
pub mod profiles;
pub mod squares;
pub mod users;

use actix_web::web;

pub use pagination::{PageQuery, Paginated};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/users")
                    .route(web::get().to(users::list_users))
                    .route(web::post().to(users::create_user)),
            )
            .service(
                web::resource("/users/{id}")
                    .route(web::get().to(users::get_user))
                    .route(web::put().to(users::update_user))
                    .route(web::patch().to(users::update_user))
                    .route(web::delete().to(users::delete_user)),
            )
            .service(web::resource("/profiles").route(web::get().to(profiles::list_profiles)))
            .service(
                web::resource("/profiles/{id}")
                    .route(web::get().to(profiles::get_profile))
                    .route(web::put().to(profiles::update_profile))
                    .route(web::patch().to(profiles::update_profile)),
            )
            .service(
                web::resource("/cards")
                    .route(web::get().to(cards::list_cards))
                    .route(web::post().to(cards::create_card)),
            )
            // Fixed segments must precede `/cards/{id}`.
            .service(web::resource("/cards/recent").route(web::get().to(cards::recent_cards)))
            .service(web::resource("/cards/mine").route(web::get().to(cards::my_cards)))
            .service(
                web::resource("/cards/{id}")
                    .route(web::get().to(cards::get_card))
                    .route(web::put().to(cards::replace_card))
                    .route(web::patch().to(cards::patch_card))
                    .route(web::delete().to(cards::delete_card)),
            )
            .service(web::resource("/squares").route(web::get().to(squares::list_squares)))
            .service(
                web::resource("/squares/{id}")
                    .route(web::get().to(squares::get_square))
                    .route(web::put().to(squares::update_square))
                    .route(web::patch().to(squares::update_square)),
            )
            .service(web::resource("/contact").route(web::get().to(contact::list_contacts)))
            .service(
                web::resource("/contact/latest").route(web::get().to(contact::latest_contact)),
            )
            .service(web::resource("/contact/{id}").route(web::get().to(contact::get_contact))),
    );
}
