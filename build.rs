// build.rs
fn main() {
    // Embedded migrations must be rebuilt when the SQL changes
    println!("cargo:rerun-if-changed=migrations");
}
