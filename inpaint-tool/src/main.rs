fn main() -> eframe::Result {
    inpaint_tool::run_native()
}
