//! Rendered message bodies.

/// OTP delivery email. The copy mentions the five-minute window so it must
/// stay in step with the challenge validity.
pub fn otp_email(code: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, Helvetica, sans-serif; max-width: 480px; margin: 0 auto;">
  <h2 style="color: #1a1a2e;">Verify your email</h2>
  <p>Use the code below to verify your email address. It expires in 5 minutes.</p>
  <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold; color: #1a1a2e;">{code}</p>
  <p style="color: #666;">If you did not request this code, you can safely ignore this email.</p>
</div>"#
    )
}
