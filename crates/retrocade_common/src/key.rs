/// Host-agnostic key identifiers.
///
/// Frontends translate their native key events into this enum so that the
/// machine crates never depend on a specific windowing library.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Key {
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    A,
    C,
    D,
    J,
    K,
    L,
    P,
    R,
    S,
    T,
    Left,
    Right,
    Up,
    Down,
    Space,
    Escape,
    /// Any key the frontend does not map.
    None,
}
