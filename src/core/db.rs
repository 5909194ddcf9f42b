use tracing::info;

use crate::config::*;
use crate::context::AppContext;
use crate::core::helpers::{hash_password, now_iso};
use crate::core::kv::{KvStore, KvStoreExt};
use crate::follow;
use crate::generator::{ImageGenerator, PlaceholderGenerator};
use crate::media::{self, MediaFolder};
use crate::models::models::User;
use crate::posts;
use crate::users;

struct DemoUser {
    username: &'static str,
    name: &'static str,
    surname: &'static str,
    city: &'static str,
    posts: &'static [&'static str],
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        username: "test",
        name: "Test",
        surname: "User",
        city: "Istanbul",
        posts: &["My first creation on ImagineHub!"],
    },
    DemoUser {
        username: "alice",
        name: "Alice",
        surname: "Moreau",
        city: "Lyon",
        posts: &[
            "A quiet harbour at dawn, painted in neon.",
            "Forest spirits made of glass.",
        ],
    },
    DemoUser {
        username: "bob",
        name: "Bob",
        surname: "Keller",
        city: "Zurich",
        posts: &["Hey everyone! Just joined, here is a retro robot."],
    },
];

/// Create the demo accounts `test`, `alice` and `bob` (password `<username>123`)
/// with a few posts, and make `test` follow `bob`. Existing accounts are left alone.
pub fn seed_demo_data(ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    let painter = PlaceholderGenerator::new(256);

    for demo in &DEMO_USERS {
        if users::find_by_username(store, demo.username)?.is_some() {
            continue;
        }
        let user = create_demo_user(ctx, demo)?;
        for text in demo.posts {
            let png = painter.generate(text)?;
            let image_url = media::store_file(store, MediaFolder::PostPics, ".png", &png)?;
            posts::insert_post(store, user.id, text.to_string(), image_url)?;
        }
        info!(username = demo.username, "seeded demo user");
    }

    if let (Some(test), Some(bob)) = (
        users::find_by_username(store, "test")?,
        users::find_by_username(store, "bob")?,
    ) {
        follow::follow_user(store, test.id, bob.id)?;
    }
    Ok(())
}

fn create_demo_user(ctx: &AppContext, demo: &DemoUser) -> anyhow::Result<User> {
    let store: &dyn KvStore = ctx.store();
    let email = format!("{}@imaginehub.local", demo.username);
    let user = User {
        id: store.next_id("user")?,
        username: demo.username.to_string(),
        email: email.clone(),
        password: hash_password(&format!("{}123", demo.username))?,
        name: demo.name.to_string(),
        surname: demo.surname.to_string(),
        middle_name: None,
        phone_number: None,
        city: Some(demo.city.to_string()),
        state: None,
        country: None,
        profile_picture: None,
        generation_tokens: ctx.config().initial_generation_tokens,
        created_at: now_iso(),
    };
    users::save_user(store, &user)?;
    store.set_json(&user_name_key(&user.username), &user.id)?;
    store.set_json(&user_email_key(&email), &user.id)?;
    Ok(user)
}
