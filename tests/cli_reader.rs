mod corpus_stub;

use std::path::Path;

use predicates::prelude::*;
use tempfile::TempDir;

fn reader(corpus: &Path, state: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("baitreader");
    cmd.env_remove("BAITREADER_SEARCH_MODE")
        .env_remove("RUST_LOG")
        .arg("--corpus-root")
        .arg(corpus)
        .arg("--state-file")
        .arg(state.join("state.json"));
    cmd
}

fn fixture() -> (TempDir, TempDir) {
    let corpus = TempDir::new().expect("corpus dir");
    corpus_stub::write_corpus(corpus.path());
    let state = TempDir::new().expect("state dir");
    (corpus, state)
}

#[test]
fn read_without_position_opens_the_first_subchapter() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .arg("read")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bab 1 / Seruling [data/b1s1.json]"))
        .stdout(predicate::str::contains("1. Dengarlah seruling bercerita (id 1)"))
        .stdout(predicate::str::contains("3. Sejak aku dipisahkan (id 3)"));
}

#[test]
fn read_shows_entry_title_and_description() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .arg("read")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "== Kidung Seruling\n",
            "1. Dengarlah seruling bercerita (id 1)\n",
            "   Pembuka Matsnawi\n",
        )));
}

#[test]
fn toc_lists_chapters_subchapters_and_descriptions() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .arg("toc")
        .assert()
        .success()
        .stdout(concat!(
            "Bab 1: Bab 1\n",
            "  0. Seruling [data/b1s1.json]\n",
            "     Keluhan seruling\n",
            "  1. Raja [data/b1s2.json]\n",
            "Bab 2: Bab 2\n",
            "  0. Cinta [data/b2s1.json]\n",
        ));
}

#[test]
fn toc_preview_lists_entries_without_moving_the_reader() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .args(["read", "--chapter", "2"])
        .assert()
        .success();

    reader(corpus.path(), state.path())
        .args(["toc", "--preview", "data/b1s1.json"])
        .assert()
        .success()
        .stdout(concat!(
            "1. Dengarlah seruling bercerita...\n",
            "2. Tentang perpisahan...\n",
            "3. Sejak aku dipisahkan...\n",
        ));

    reader(corpus.path(), state.path())
        .arg("resume")
        .assert()
        .success()
        .stdout(predicate::str::contains("[data/b2s1.json]"));

    reader(corpus.path(), state.path())
        .args(["toc", "--preview", "data/nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not listed in the manifest"));
}

#[test]
fn read_numbers_entries_after_preceding_subchapters() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .args(["read", "--chapter", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6. Cinta adalah obat (id 6)"))
        .stdout(predicate::str::contains("7. Bagi segala penyakit (id 7)"));

    reader(corpus.path(), state.path())
        .args(["read", "--file", "data/b1s2.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4. Raja jatuh cinta (id 4)"));
}

#[test]
fn unknown_chapter_fails() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .args(["read", "--chapter", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read"));
}

#[test]
fn next_and_prev_follow_the_last_read_position() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .args(["read", "--chapter", "1", "--subchapter", "1"])
        .assert()
        .success();

    reader(corpus.path(), state.path())
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bab 2 / Cinta"))
        .stderr(predicate::str::contains("Bab 2 begins"));

    reader(corpus.path(), state.path())
        .arg("resume")
        .assert()
        .success()
        .stdout(predicate::str::contains("[data/b2s1.json]"));

    reader(corpus.path(), state.path())
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No more sub-chapters"));

    reader(corpus.path(), state.path())
        .arg("prev")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bab 1 / Raja"));
}

#[test]
fn edit_is_shown_on_the_next_read() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .args(["edit", "2", "--indo", "Tentang rindu", "--inggris", "Of longing"])
        .assert()
        .success()
        .stdout("Saved edit for entry 2.\n");

    reader(corpus.path(), state.path())
        .arg("read")
        .assert()
        .success()
        .stdout(predicate::str::contains("2. Tentang rindu (id 2) [edited]"))
        .stdout(predicate::str::contains("Tentang perpisahan").not());
}

#[test]
fn bookmark_toggles_and_lists() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .args(["bookmark", "3"])
        .assert()
        .success()
        .stdout("Bookmarked entry 3.\n");

    reader(corpus.path(), state.path())
        .arg("bookmark")
        .assert()
        .success()
        .stdout("3\n");

    reader(corpus.path(), state.path())
        .arg("read")
        .assert()
        .success()
        .stdout(predicate::str::contains("3. Sejak aku dipisahkan (id 3) [bookmarked]"));

    reader(corpus.path(), state.path())
        .args(["bookmark", "3"])
        .assert()
        .success()
        .stdout("Removed bookmark for entry 3.\n");
}

#[test]
fn search_gives_the_same_hits_in_both_modes() {
    let (corpus, state) = fixture();
    let expected = concat!(
        "Bab 1 / Raja #1 (id 4): Raja jatuh cinta\n",
        "Bab 2 / Cinta #1 (id 6): Cinta adalah obat\n",
    );
    for mode in ["inline", "worker"] {
        reader(corpus.path(), state.path())
            .args(["search", "CINTA", "--search-mode", mode])
            .assert()
            .success()
            .stdout(expected);
    }
}

#[test]
fn search_without_matches_says_so() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .args(["search", "zzz"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No matches"));
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() {
    let (corpus, state) = fixture();
    reader(corpus.path(), state.path())
        .env("RUST_LOG", "debug")
        .arg("resume")
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
