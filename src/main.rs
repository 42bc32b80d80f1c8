use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    diybot::cli::main()
}
