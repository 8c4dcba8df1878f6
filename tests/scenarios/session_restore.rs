use pretty_assertions::assert_eq;
use querylens_core::InitialQuerySource;
use querylens_integration_tests::{open_session, workspace};
use querylens_query::{default_query, Operator, Rule, RuleGroup};
use querylens_test_utils::fixtures::DATASET_KEY;

const BASE_URL: &str = "http://localhost:5173/";

#[test]
fn first_session_starts_from_defaults() {
    let dir = workspace();
    let session = open_session(dir.path(), BASE_URL, None);

    assert_eq!(session.session().initial_source(), InitialQuerySource::Default);
    assert_eq!(session.session().query_text(), default_query(DATASET_KEY));
}

#[test]
fn edits_and_rule_tree_survive_a_restart() {
    let dir = workspace();
    {
        let first = open_session(dir.path(), BASE_URL, None);
        first
            .session()
            .commit_query_text("SELECT titleId, title FROM 'd.parquet' ORDER BY title LIMIT 25")
            .unwrap();
        first
            .session()
            .set_rule_tree(
                RuleGroup::or(Vec::new())
                    .with_rule(Rule::new("title", Operator::Contains, "matrix"))
                    .with_rule(Rule::new("startYear", Operator::LessThan, "1990")),
            )
            .unwrap();
    }

    let second = open_session(dir.path(), BASE_URL, None);
    assert_eq!(second.session().initial_source(), InitialQuerySource::Persisted);

    let text = second.session().build().unwrap();
    assert_eq!(
        text,
        "SELECT titleId, title\nFROM 'd.parquet'\nWHERE\nUPPER(title) LIKE UPPER('%matrix%') OR\nstartYear < 1990\nORDER BY title\nLIMIT 25"
    );
}

#[test]
fn shared_url_wins_over_persisted_text() {
    let dir = workspace();
    open_session(dir.path(), BASE_URL, None)
        .session()
        .commit_query_text("SELECT 1")
        .unwrap();

    let shared = open_session(
        dir.path(),
        BASE_URL,
        Some("https://explorer.local/?query=SELECT+2"),
    );
    assert_eq!(shared.session().initial_source(), InitialQuerySource::SharedLocation);
    assert_eq!(shared.session().query_text(), "SELECT 2");
}
