#[derive(Clone, formwork::FormModel)]
enum Direction {
    Up,
    Down,
}

fn main() {}
