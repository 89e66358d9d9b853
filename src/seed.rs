use sqlx::Row;
use uuid::Uuid;

use crate::db::DatabaseProxy;

/// Ensures the demo account exists. Enabled by default so a fresh install is
/// immediately usable; set SEED_DEMO_USER=false to skip.
pub async fn seed_demo_user(proxy: &DatabaseProxy) {
    let enabled = std::env::var("SEED_DEMO_USER")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);
    if !enabled {
        return;
    }

    let pool = proxy.pool();

    let existing: Option<String> = sqlx::query(r#"SELECT "id" FROM "users" WHERE "username" = $1"#)
        .bind("demo")
        .fetch_optional(pool)
        .await
        .ok()
        .flatten()
        .and_then(|row| row.try_get("id").ok());

    if existing.is_some() {
        tracing::debug!("demo user already exists");
        return;
    }

    let password_hash = bcrypt::hash("demo", 4).unwrap_or_default();

    if let Err(err) = sqlx::query(
        r#"
        INSERT INTO "users" ("id", "username", "passwordHash")
        VALUES ($1, $2, $3)
        ON CONFLICT ("username") DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind("demo")
    .bind(&password_hash)
    .execute(pool)
    .await
    {
        tracing::warn!(error = %err, "failed to seed demo user");
    } else {
        tracing::info!("seeded demo user");
    }
}

struct StarterWord {
    word: &'static str,
    definition: &'static str,
    pronunciation: &'static str,
    example: &'static str,
}

const STARTER_WORDS: &[StarterWord] = &[
    StarterWord {
        word: "ephemeral",
        definition: "adjective: lasting for a very short time",
        pronunciation: "/əˈfem(ə)rəl/",
        example: "Fame in that industry is ephemeral.",
    },
    StarterWord {
        word: "ubiquitous",
        definition: "adjective: present, appearing, or found everywhere",
        pronunciation: "/juːˈbɪkwɪtəs/",
        example: "Smartphones have become ubiquitous.",
    },
    StarterWord {
        word: "serendipity",
        definition: "noun: the occurrence of events by chance in a happy or beneficial way",
        pronunciation: "/ˌserənˈdɪpɪti/",
        example: "They met by pure serendipity.",
    },
    StarterWord {
        word: "eloquent",
        definition: "adjective: fluent or persuasive in speaking or writing",
        pronunciation: "/ˈeləkwənt/",
        example: "She gave an eloquent speech.",
    },
    StarterWord {
        word: "resilient",
        definition: "adjective: able to withstand or recover quickly from difficulties",
        pronunciation: "/rɪˈzɪliənt/",
        example: "Children are often remarkably resilient.",
    },
    StarterWord {
        word: "meticulous",
        definition: "adjective: showing great attention to detail; very careful and precise",
        pronunciation: "/məˈtɪkjələs/",
        example: "He kept meticulous records.",
    },
    StarterWord {
        word: "pragmatic",
        definition: "adjective: dealing with things sensibly and realistically",
        pronunciation: "/praɡˈmatɪk/",
        example: "She took a pragmatic approach to the problem.",
    },
    StarterWord {
        word: "ambiguous",
        definition: "adjective: open to more than one interpretation; not having one obvious meaning",
        pronunciation: "/amˈbɪɡjuəs/",
        example: "The instructions were ambiguous.",
    },
    StarterWord {
        word: "tenacious",
        definition: "adjective: tending to keep a firm hold of something; persistent",
        pronunciation: "/tɪˈneɪʃəs/",
        example: "A tenacious negotiator rarely walks away empty-handed.",
    },
    StarterWord {
        word: "candid",
        definition: "adjective: truthful and straightforward; frank",
        pronunciation: "/ˈkandɪd/",
        example: "His candid admission surprised everyone.",
    },
];

/// Loads a small starter vocabulary into an empty catalog so quizzes have a
/// word pool before anyone adds words by hand.
pub async fn seed_starter_words(proxy: &DatabaseProxy) {
    let pool = proxy.pool();

    let count: i64 = match sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words""#)
        .fetch_one(pool)
        .await
    {
        Ok(count) => count,
        Err(err) => {
            tracing::warn!(error = %err, "failed to count words for seeding");
            return;
        }
    };
    if count > 0 {
        return;
    }

    let today = chrono::Utc::now().date_naive();
    let mut seeded = 0;
    for entry in STARTER_WORDS {
        let result = sqlx::query(
            r#"
            INSERT INTO "words"
              ("word", "definition", "pronunciation", "example1", "addedBy", "dateAdded")
            VALUES ($1, $2, $3, $4, 'system', $5)
            ON CONFLICT ("word") DO NOTHING
            "#,
        )
        .bind(entry.word)
        .bind(entry.definition)
        .bind(entry.pronunciation)
        .bind(entry.example)
        .bind(today)
        .execute(pool)
        .await;

        match result {
            Ok(_) => seeded += 1,
            Err(err) => {
                tracing::warn!(word = entry.word, error = %err, "failed to seed word");
            }
        }
    }

    if seeded > 0 {
        tracing::info!(count = seeded, "seeded starter words");
    }
}
