// Cases for NO_STDIO_OUTPUT

fn leaks_submission(fields: &str) {
    println!("received {fields}");
}

fn leaks_error() {
    eprintln!("append failed");
}

fn leaks_partial() {
    print!("partial ");
    eprint!("partial ");
}

fn leaks_debug() {
    let envelope = "envelope";
    dbg!(envelope);
}

fn qualified() {
    std::println!("still stdout");
}

// Allowed: structured logging
fn structured() {
    tracing::info!(request_id = "req-1", "row appended");
}

fn main() {
    leaks_submission("Name=Jo");
    leaks_error();
    leaks_partial();
    leaks_debug();
    qualified();
    structured();
}
