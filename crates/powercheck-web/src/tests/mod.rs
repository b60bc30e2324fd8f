mod cors;
mod scripts;
