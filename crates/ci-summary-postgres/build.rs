#![forbid(unsafe_code)]

/// `embed_migrations!` reads the migration directory at compile time, but
/// proc-macros cannot declare file dependencies. Adding or editing an SQL file
/// would leave a stale set of embedded migrations behind without this hint.
fn main() {
    println!("cargo:rerun-if-changed=./migrations");
}
