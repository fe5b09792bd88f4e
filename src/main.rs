fn main() {
    hdrlisp::cli::run();
}
