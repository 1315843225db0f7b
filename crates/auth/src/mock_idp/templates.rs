//! HTML templates for the Mock IdP pages.

/// Escape HTML special characters to prevent XSS.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Hidden fields carried from the authorize request to the form submission.
pub struct LoginPage<'a> {
    pub user_flow: &'a str,
    pub client_id: &'a str,
    pub state: &'a str,
    pub nonce: &'a str,
    pub redirect_uri: &'a str,
}

/// Generate the sign-in page for a user flow.
pub fn login_page(page: &LoginPage<'_>) -> String {
    let title = if page.user_flow.to_ascii_lowercase().contains("edit") {
        "Edit profile"
    } else {
        "Sign in"
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Mock B2C {title} (DEV ONLY)</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, sans-serif;
            max-width: 400px;
            margin: 100px auto;
            padding: 20px;
        }}
        .warning {{
            background: #fff3cd;
            border: 1px solid #ffc107;
            padding: 15px;
            border-radius: 8px;
            margin-bottom: 20px;
        }}
        form {{
            background: #f8f9fa;
            padding: 20px;
            border-radius: 8px;
        }}
        label {{
            display: block;
            margin-bottom: 5px;
            font-weight: 500;
        }}
        input[type="email"], input[type="text"] {{
            width: 100%;
            padding: 10px;
            margin-bottom: 15px;
            border: 1px solid #ced4da;
            border-radius: 4px;
            box-sizing: border-box;
        }}
        button {{
            width: 100%;
            padding: 12px;
            margin-bottom: 8px;
            border: none;
            border-radius: 4px;
            cursor: pointer;
            font-size: 16px;
        }}
        button[value="submit"] {{
            background: #007bff;
            color: white;
        }}
    </style>
</head>
<body>
    <div class="warning">
        <h2>Development Only</h2>
        <p>Mock <strong>{user_flow}</strong> user flow. Any email address is accepted.</p>
    </div>

    <form action="/authorize/submit" method="POST">
        <input type="hidden" name="user_flow" value="{user_flow}" />
        <input type="hidden" name="client_id" value="{client_id}" />
        <input type="hidden" name="state" value="{state}" />
        <input type="hidden" name="nonce" value="{nonce}" />
        <input type="hidden" name="redirect_uri" value="{redirect_uri}" />

        <label for="email">Email Address</label>
        <input type="email" id="email" name="email" placeholder="dev@example.com" required />

        <label for="name">Display Name (optional)</label>
        <input type="text" id="name" name="name" placeholder="Dev User" />

        <button type="submit" name="action" value="submit">{title}</button>
        <button type="submit" name="action" value="cancel" formnovalidate>Cancel</button>
    </form>
</body>
</html>"#,
        user_flow = html_escape(page.user_flow),
        client_id = html_escape(page.client_id),
        state = html_escape(page.state),
        nonce = html_escape(page.nonce),
        redirect_uri = html_escape(page.redirect_uri),
    )
}
