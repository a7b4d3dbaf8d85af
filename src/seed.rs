//! Demo data for local development: two accounts and three stories.

use readalong_auth::hash_password;
use readalong_core::{Difficulty, Role};
use readalong_store::stories::StoryRepo;
use readalong_store::users::UserRepo;
use readalong_store::{Database, StoreError};

struct SampleStory {
    title: &'static str,
    difficulty: Difficulty,
    text: &'static str,
}

const SAMPLE_STORIES: [SampleStory; 3] = [
    SampleStory {
        title: "The Little Red Hen",
        difficulty: Difficulty::Beginner,
        text: "Once upon a time there was a little red hen. She lived on a farm with a dog, \
               a cat, and a pig. One day the little red hen found some grains of wheat. Who \
               will help me plant these grains? she asked. Not I said the dog. Not I said the \
               cat. Not I said the pig. Then I will plant them myself said the little red hen. \
               And she did.",
    },
    SampleStory {
        title: "The Friendship",
        difficulty: Difficulty::Intermediate,
        text: "Friendship is one of the most valuable treasures in life. True friends are \
               there for you in good times and bad times. They listen when you need to talk \
               and offer help without expecting anything in return. A real friend accepts you \
               for who you are and helps you become the best version of yourself. Building \
               strong friendships takes time, trust, and mutual respect.",
    },
    SampleStory {
        title: "Climate Change",
        difficulty: Difficulty::Advanced,
        text: "Climate change represents one of the most significant challenges facing \
               humanity in the twenty-first century. The scientific consensus indicates that \
               human activities, particularly the emission of greenhouse gases through fossil \
               fuel combustion and deforestation, are driving unprecedented changes in global \
               climate patterns. These alterations manifest through rising temperatures, \
               shifting precipitation patterns, and increased frequency of extreme weather \
               events.",
    },
];

/// Seed demo users and stories. Idempotent: existing rows are left alone.
pub fn run(db: &Database) -> anyhow::Result<()> {
    let users = UserRepo::new(db.clone());
    ensure_user(&users, "Admin User", "admin@example.com", "admin123", Role::Admin)?;
    ensure_user(
        &users,
        "Student User",
        "student@example.com",
        "student123",
        Role::Student,
    )?;

    let stories = StoryRepo::new(db.clone());
    if stories.list()?.is_empty() {
        for story in &SAMPLE_STORIES {
            let created = stories.create(story.title, story.text, None, story.difficulty)?;
            tracing::info!(story_id = %created.id, title = story.title, "story seeded");
        }
    } else {
        tracing::info!("stories already present, skipping");
    }

    tracing::info!("seed complete");
    Ok(())
}

fn ensure_user(
    users: &UserRepo,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<()> {
    match users.find_by_email(email) {
        Ok(_) => {
            tracing::info!(email, "user already exists, skipping");
            Ok(())
        }
        Err(StoreError::NotFound(_)) => {
            let user = users.create(name, email, &hash_password(password), role)?;
            tracing::info!(user_id = %user.id, email, role = %role, "user seeded");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
