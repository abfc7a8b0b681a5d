//! Sample inputs for testing and for `certforge --init`.

/// A landscape-friendly certificate exercising every required field.
pub fn certificate_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Certificate of Completion</title>
    <style>
        body { margin: 0; font-family: Georgia, serif; text-align: center; }
        .frame { border: 12px double #1a365d; margin: 0.5in; padding: 0.75in; }
        .name { font-size: 36px; color: #1a365d; }
    </style>
</head>
<body>
<div class="frame text-center">
    <h1 style="color: #1a365d">Certificate of Completion</h1>
    <p>This certifies that</p>
    <p class="name" style="font-size: 36px; font-weight: bold">{{ FirstName }} {{ LastName }}</p>
    <p>has successfully completed</p>
    <h2>{{ EventTitle }}</h2>
    <p>on {{ EventDate }}</p>
    {% if CEUs is defined and CEUs %}<p>Continuing education units awarded: {{ CEUs }}</p>{% endif %}
    <p style="font-size: 10px; color: #555555">Issued to {{ EmailAddress }}</p>
</div>
</body>
</html>
"##
}

/// A small attendee table with an optional extra column.
pub fn attendees_csv() -> &'static str {
    "FirstName,LastName,EmailAddress,EventTitle,EventDate,CEUs\n\
     Ana,Lee,ana.lee@example.com,Intro to X,2024-01-05,1.5\n\
     Bruno,Díaz,bruno@example.com,Intro to X,2024-01-05,1.5\n\
     Chloé,O'Neil,chloe@example.com,Intro to X,2024-01-05,\n"
}
