use std::io::{self, Write};

pub fn show_menu() {
    println!("\n==========================================");
    println!("TPR Measurement Rig");
    println!("==========================================");
    println!("Select an option:");
    println!("1. Simulated measurement run");
    println!("2. Measurement run with spring sensor");
    println!("3. Exit");
    println!("==========================================");
    print!("Choice (1-3): ");
    io::stdout().flush().unwrap();
}

pub fn get_user_choice() -> Result<u32, std::num::ParseIntError> {
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    input.trim().parse::<u32>()
}
