pub mod command_line;
