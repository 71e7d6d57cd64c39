#[derive(Clone, formwork::FormModel)]
struct Point(f32, f32);

fn main() {}
