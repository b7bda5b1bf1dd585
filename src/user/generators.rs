/// Generates a display name such as `brave-falcon` for users who do not pick one
pub fn generate_username() -> String {
    petname::Petnames::default().generate_one(2, "-")
}
