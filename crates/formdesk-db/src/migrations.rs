use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                token_version   INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE forms (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                name                TEXT NOT NULL,
                slug                TEXT NOT NULL UNIQUE,
                description         TEXT NOT NULL,
                limit_one_response  INTEGER NOT NULL DEFAULT 0,
                creator_id          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_forms_creator ON forms(creator_id);

            CREATE TABLE allowed_domains (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                form_id     INTEGER NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                domain      TEXT NOT NULL
            );

            CREATE INDEX idx_allowed_domains_form ON allowed_domains(form_id);

            CREATE TABLE questions (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                form_id     INTEGER NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                choice_type TEXT NOT NULL,
                choices     TEXT,
                is_required INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_questions_form ON questions(form_id, id);

            -- `exclusive` is set when the form limited responses at submission
            -- time; the partial index then allows one such row per respondent.
            CREATE TABLE responses (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                form_id     INTEGER NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                exclusive   INTEGER NOT NULL DEFAULT 0,
                date        TEXT NOT NULL
            );

            CREATE INDEX idx_responses_form_user ON responses(form_id, user_id);

            CREATE UNIQUE INDEX uq_responses_one_per_user
                ON responses(form_id, user_id) WHERE exclusive = 1;

            CREATE TABLE answers (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                response_id INTEGER NOT NULL REFERENCES responses(id) ON DELETE CASCADE,
                question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                value       TEXT
            );

            CREATE INDEX idx_answers_response ON answers(response_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerunning_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
