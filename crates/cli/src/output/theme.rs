use colored::Colorize;

pub fn print_header(title: &str) {
    let width = title.chars().count() + 6;
    let border = "─".repeat(width);
    println!();
    println!("  ╭{}╮", border.cyan());
    println!("  │   {}   │", title.bright_cyan().bold());
    println!("  ╰{}╯", border.cyan());
    println!();
}

pub fn print_kv(label: &str, value: &str) {
    println!(
        "    {} {}",
        format!("{:<16}", label).dimmed(),
        value.bright_white()
    );
}

pub fn print_dim(msg: &str) {
    println!("  {}", msg.dimmed());
}
