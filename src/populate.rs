//! Demo data for development databases.

use chrono::Utc;
use tracing::info;

use crate::auth::AuthService;
use crate::db::models::{
    NewCard, NewContact, NewUser, ProfileChanges, DEFAULT_FREE_SPACE, SQUARES_PER_CARD,
};
use crate::db::BingoStore;
use crate::Result;

struct DemoUser {
    username: &'static str,
    password: &'static str,
    email: &'static str,
    website: &'static str,
    private: bool,
    about_me: &'static str,
}

const DEMO_USERS: [DemoUser; 4] = [
    DemoUser {
        username: "RickSanchez",
        password: "M0rty-!5-My-53Cre7-CR|_|5|-|",
        email: "plumbusdinglebop@gmail.com",
        website: "http://rickandmorty.wikia.com/wiki/Rick_Sanchez",
        private: false,
        about_me: "Absent from the family for fourteen years, then back in the garage.",
    },
    DemoUser {
        username: "MortySmith",
        password: "R!cK-r|-|ymes-w!7h-|]![|<",
        email: "mortyismyrealname@aol.com",
        website: "http://rickandmorty.wikia.com/wiki/Morty_Smith",
        private: false,
        about_me: "Often forced to tag along on various misadventures.",
    },
    DemoUser {
        username: "JerrySmith",
        password: "iamverysmartandbrave",
        email: "bethismean@hotmail.com",
        website: "http://rickandmorty.wikia.com/wiki/Jerry_Smith",
        private: true,
        about_me: "Always tries to think of the best interest of the family.",
    },
    DemoUser {
        username: "BethSmith",
        password: "vetsarerealdoctos",
        email: "Beth.Smith.Is.A.Real.Doctor@gmail.com",
        website: "http://rickandmorty.wikia.com/wiki/Beth_Smith",
        private: true,
        about_me: "Horse surgeon. Sanctimonious and above others.",
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub users_created: usize,
    pub users_skipped: usize,
    pub contacts_created: usize,
    pub cards_created: usize,
}

/// Seeds demo users with profiles, a contact record and one card per new
/// user. Users that already exist are left alone, as is the contact table
/// once it has a record.
pub async fn populate(store: &dyn BingoStore, auth: &AuthService) -> Result<PopulateReport> {
    let mut report = PopulateReport::default();

    for (index, demo) in DEMO_USERS.iter().enumerate() {
        if store.get_user_by_username(demo.username).await?.is_some() {
            info!("User {} already exists, skipping", demo.username);
            report.users_skipped += 1;
            continue;
        }

        let (user, profile) = store
            .create_user(NewUser {
                username: demo.username.to_string(),
                email: demo.email.to_string(),
                password_hash: auth.hash_password(demo.password),
                is_staff: index == 0,
            })
            .await?;
        store
            .update_profile(
                profile.id,
                ProfileChanges {
                    website: Some(demo.website.to_string()),
                    private: Some(demo.private),
                    about_me: Some(demo.about_me.to_string()),
                    picture: None,
                },
            )
            .await?;
        report.users_created += 1;

        store
            .create_card(NewCard {
                title: format!("{}'s Card", demo.username),
                free_space: DEFAULT_FREE_SPACE.to_string(),
                creator_id: user.id,
                private: demo.private,
                squares: (0..SQUARES_PER_CARD).map(|i| i.to_string()).collect(),
            })
            .await?;
        report.cards_created += 1;
        info!("Created demo user {} with one card", demo.username);
    }

    if store.latest_contact().await?.is_none() {
        store
            .create_contact(NewContact {
                title: "Contact".to_string(),
                facebook: "https://www.facebook.com/JayWelb".to_string(),
                github: "https://www.github.com/jaywelborn".to_string(),
                linkedin: "https://www.linkedin.com/in/--jaywelborn--/".to_string(),
                twitter: "https://twitter.com/__JayWelborn__".to_string(),
                email: "jesse.welborn@gmail.com".to_string(),
                contact_date: Utc::now().date_naive(),
            })
            .await?;
        report.contacts_created += 1;
    }

    Ok(report)
}
