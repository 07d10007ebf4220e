use std::fmt::Write;

use crate::db::models::{CardDetail, ProfileSummary};

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn card_results(cards: &[CardDetail]) -> String {
    if cards.is_empty() {
        return "<p class=\"no-results\">No cards found.</p>\n".to_string();
    }

    let mut html = String::from("<ul class=\"search-results card-results\">\n");
    for detail in cards {
        let card = &detail.card;
        // Writing to a String cannot fail.
        let _ = writeln!(
            html,
            "  <li><a href=\"/api/cards/{}\" data-slug=\"{}\">{}</a> <span class=\"creator\">by {}</span>{}</li>",
            card.id,
            escape(&card.slug),
            escape(&card.title),
            escape(&detail.creator),
            if card.private {
                " <span class=\"private\">private</span>"
            } else {
                ""
            },
        );
    }
    html.push_str("</ul>\n");
    html
}

pub fn profile_results(profiles: &[ProfileSummary]) -> String {
    if profiles.is_empty() {
        return "<p class=\"no-results\">No profiles found.</p>\n".to_string();
    }

    let mut html = String::from("<ul class=\"search-results profile-results\">\n");
    for summary in profiles {
        let profile = &summary.profile;
        let _ = writeln!(
            html,
            "  <li><a href=\"/api/profiles/{}\" data-slug=\"{}\">{}</a></li>",
            profile.id,
            escape(&profile.slug),
            escape(&summary.username),
        );
    }
    html.push_str("</ul>\n");
    html
}
