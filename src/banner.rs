// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
 _            _        _               _
| |_ __ _ ___| | _____| |__   ___  ___| | __
| __/ _` / __| |/ / __| '_ \ / _ \/ __| |/ /
| || (_| \__ \   < (__| | | |  __/ (__|   <
 \__\__,_|___/_|\_\___|_| |_|\___|\___|_|\_\

    Off-chain Task Verification Tester
"#;
    println!("{}", banner);
}
