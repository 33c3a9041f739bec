use chrono::NaiveDateTime;

const SYSTEM_PROMPT_TEMPLATE: &str = "You are a helpful assistant that parses natural language into calendar event data.

Today is {weekday}, {date}. The current local time is {time}.

Follow these rules strictly:
1.  Resolve relative day references against today. A weekday name such as \"Saturday\" means the next occurrence strictly after today, never today itself. \"Tomorrow\" means {tomorrow}.
2.  The summary is the event title only. Never put dates, times or weekdays in it (\"Lunch with Sam tomorrow at noon\" has the summary \"Lunch with Sam\").
3.  If no end time or duration is given, the event lasts one hour.
4.  If the event repeats, express the repetition as a list of RFC 5545 RRULE strings, for example [\"RRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;UNTIL=20261231T235959Z\"]. If it does not repeat, use an empty list.
5.  Return only a single JSON object with exactly this structure and no other text:
{
  \"summary\": \"event title\",
  \"start\": \"YYYY-MM-DDTHH:MM:SS\",
  \"end\": \"YYYY-MM-DDTHH:MM:SS\",
  \"timezone\": \"IANA timezone name\",
  \"recurrence\": []
}";

/// System instruction for the completion call, anchored at `now`
pub fn system_instruction(now: NaiveDateTime) -> String {
    let tomorrow = now
        .date()
        .succ_opt()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "the day after today".to_string());

    SYSTEM_PROMPT_TEMPLATE
        .replace("{weekday}", &now.format("%A").to_string())
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{time}", &now.format("%H:%M").to_string())
        .replace("{tomorrow}", &tomorrow)
}
